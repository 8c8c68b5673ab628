//! Containment state machine.
//!
//! Evaluates accepted samples against the active geofence set of a family
//! and produces boundary-crossing transitions exactly once. The tracker is
//! pure over data the caller already serializes per subject; it performs no
//! I/O and holds no locks of its own.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use domain::models::containment::{Containment, ContainmentState};
use domain::models::geofence::Geofence;
use domain::models::geofence_event::GeofenceTransition;
use domain::models::location::LocationSample;

use crate::geometry::haversine_distance_meters;

/// A boundary crossing produced by one evaluation.
///
/// Carries the geofence so the caller can denormalize its name and honor
/// its notification flags without re-reading the registry.
#[derive(Debug, Clone)]
pub struct Transition {
    pub geofence: Geofence,
    pub transition: GeofenceTransition,
}

/// The per-(subject, geofence) containment state machine.
pub struct ContainmentTracker;

impl ContainmentTracker {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates one accepted sample against the active geofence snapshot.
    ///
    /// `states` is the subject's containment map; entries for geofences no
    /// longer in the snapshot are discarded without emitting an exit. A
    /// missing entry starts as `Unknown`, which records the first observed
    /// membership without emitting an event. Re-evaluating a sample against
    /// unchanged state emits nothing, which makes replayed deliveries
    /// naturally idempotent.
    pub fn evaluate(
        &self,
        states: &mut HashMap<Uuid, ContainmentState>,
        sample: &LocationSample,
        active: &[Geofence],
        now: DateTime<Utc>,
    ) -> Vec<Transition> {
        states.retain(|geofence_id, _| active.iter().any(|g| g.id == *geofence_id));

        let mut transitions = Vec::new();

        for geofence in active {
            let distance = haversine_distance_meters(
                sample.latitude,
                sample.longitude,
                geofence.latitude,
                geofence.longitude,
            );
            let inside = distance <= geofence.radius_meters;

            let state = states.entry(geofence.id).or_insert_with(|| {
                ContainmentState::unknown(sample.subject_id, geofence.id, now)
            });

            match (state.containment, inside) {
                (Containment::Unknown, true) => {
                    state.containment = Containment::Inside;
                }
                (Containment::Unknown, false) => {
                    state.containment = Containment::Outside;
                }
                (Containment::Outside, true) => {
                    state.containment = Containment::Inside;
                    transitions.push(Transition {
                        geofence: geofence.clone(),
                        transition: GeofenceTransition::Enter,
                    });
                }
                (Containment::Inside, false) => {
                    state.containment = Containment::Outside;
                    transitions.push(Transition {
                        geofence: geofence.clone(),
                        transition: GeofenceTransition::Exit,
                    });
                }
                (Containment::Inside, true) | (Containment::Outside, false) => {}
            }

            state.last_evaluated_at = now;
        }

        transitions
    }
}

impl Default for ContainmentTracker {
    fn default() -> Self {
        Self::new()
    }
}
