//! Containment state for (subject, geofence) pairs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Known containment of a subject relative to a geofence.
///
/// `Unknown` is the initial state before any sample has been evaluated
/// against the geofence. The first evaluation records Inside or Outside
/// without emitting an event; only transitions from a known state emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Containment {
    Unknown,
    Inside,
    Outside,
}

/// Cached evaluation state for one (subject, geofence) pair.
///
/// This is a cache, never a source of truth: it can be rebuilt from the
/// latest event plus the latest sample, and a missing or corrupt entry is
/// recreated as `Unknown` rather than treated as fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainmentState {
    pub subject_id: Uuid,
    pub geofence_id: Uuid,
    pub containment: Containment,
    pub last_evaluated_at: DateTime<Utc>,
}

impl ContainmentState {
    /// Fresh state for a pair that has never been evaluated.
    pub fn unknown(subject_id: Uuid, geofence_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            subject_id,
            geofence_id,
            containment: Containment::Unknown,
            last_evaluated_at: now,
        }
    }

    /// Whether the last evaluation placed the subject inside the geofence.
    pub fn is_inside(&self) -> bool {
        self.containment == Containment::Inside
    }
}
