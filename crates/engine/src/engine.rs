//! Engine orchestrator.
//!
//! Owns per-subject serialization, the background-monitoring capability
//! flag, and the dispatch of persistence and notifications after each
//! in-memory state transition commits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use domain::models::containment::ContainmentState;
use domain::models::geofence_event::{EventLocation, GeofenceEvent, GeofenceTransition};
use domain::models::location::{IngestDisposition, LatestPosition, LocationSample};
use domain::services::dispatch::{DispatchResult, NotificationDispatcher, TransitionNotification};

use crate::directory::FamilyDirectory;
use crate::error::EngineError;
use crate::filter::{FilterConfig, SampleFilter};
use crate::metrics;
use crate::registry::{GeofenceRegistry, RegistryChange};
use crate::store::{EventStore, LatestPositionStore};
use crate::tracker::{ContainmentTracker, Transition};

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub filter: FilterConfig,
    /// Speed above which a sample carries the movement flag.
    pub movement_speed_threshold_mps: f64,
    /// Attempts for one event append.
    pub persist_attempts: u32,
    /// Base backoff between append attempts; grows linearly per attempt.
    pub persist_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            movement_speed_threshold_mps: 0.5,
            persist_attempts: 3,
            persist_backoff: Duration::from_millis(250),
        }
    }
}

/// What happened to one ingested sample.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub disposition: IngestDisposition,
    /// Number of transition events the sample produced.
    pub transitions: usize,
}

/// Per-subject evaluation state.
///
/// The lane mutex is the critical section of the state machine: all
/// evaluations for one subject apply in arrival order and never interleave.
/// Different subjects run fully in parallel.
struct SubjectLane {
    family_id: Uuid,
    last_accepted: Option<LocationSample>,
    containment: HashMap<Uuid, ContainmentState>,
}

/// Decrements the in-flight counter when a spawned task finishes, panicking
/// included.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The location-sampling and geofence-transition engine.
pub struct LocationEngine {
    config: EngineConfig,
    filter: SampleFilter,
    tracker: ContainmentTracker,
    registry: Arc<GeofenceRegistry>,
    directory: Arc<dyn FamilyDirectory>,
    events: Arc<dyn EventStore>,
    positions: Arc<dyn LatestPositionStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    lanes: Mutex<HashMap<Uuid, Arc<Mutex<SubjectLane>>>>,
    background_authorized: AtomicBool,
    suspended: AtomicBool,
    in_flight: Arc<AtomicUsize>,
    registry_listener: Mutex<Option<JoinHandle<()>>>,
}

impl LocationEngine {
    pub fn new(
        config: EngineConfig,
        registry: Arc<GeofenceRegistry>,
        directory: Arc<dyn FamilyDirectory>,
        events: Arc<dyn EventStore>,
        positions: Arc<dyn LatestPositionStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            filter: SampleFilter::new(config.filter.clone()),
            tracker: ContainmentTracker::new(),
            config,
            registry,
            directory,
            events,
            positions,
            dispatcher,
            lanes: Mutex::new(HashMap::new()),
            background_authorized: AtomicBool::new(true),
            suspended: AtomicBool::new(false),
            in_flight: Arc::new(AtomicUsize::new(0)),
            registry_listener: Mutex::new(None),
        }
    }

    /// Ingests one raw fix for a subject.
    ///
    /// `address` is an optional reverse-geocoded label passed through to the
    /// latest-position record.
    pub async fn ingest(
        &self,
        sample: LocationSample,
        address: Option<String>,
    ) -> Result<IngestReport, EngineError> {
        if self.suspended.load(Ordering::SeqCst) {
            return Err(EngineError::Suspended);
        }

        let family_id = self
            .directory
            .family_of_subject(sample.subject_id)
            .await?
            .ok_or_else(|| {
                EngineError::Unauthorized("Subject does not belong to any family".into())
            })?;

        if !self.background_authorized.load(Ordering::SeqCst) {
            metrics::record_sample_informational();
            debug!(
                subject_id = %sample.subject_id,
                "Background monitoring unauthorized; sample recorded informational-only"
            );
            let position = self.position_record(&sample, family_id, address);
            self.spawn_position_upsert(position);
            return Ok(IngestReport {
                disposition: IngestDisposition::Informational,
                transitions: 0,
            });
        }

        let member = self
            .directory
            .member(family_id, sample.subject_id)
            .await?
            .ok_or_else(|| EngineError::Unauthorized("Subject is not a family member".into()))?;

        let lane_arc = self.lane(sample.subject_id, family_id).await;
        let mut lane = lane_arc.lock().await;

        if lane.family_id != family_id {
            // Subject changed families: containment restarts from scratch.
            lane.family_id = family_id;
            lane.containment.clear();
            lane.last_accepted = None;
        }

        let now = Utc::now();
        if let Err(reason) = self.filter.accept(lane.last_accepted.as_ref(), &sample, now) {
            metrics::record_sample_rejected(reason.as_str());
            debug!(
                subject_id = %sample.subject_id,
                reason = reason.as_str(),
                "Sample dropped by significance filter"
            );
            return Ok(IngestReport {
                disposition: IngestDisposition::Rejected,
                transitions: 0,
            });
        }
        metrics::record_sample_accepted();

        let snapshot = self.registry.active_for(family_id).await;
        let transitions = self
            .tracker
            .evaluate(&mut lane.containment, &sample, &snapshot, now);
        lane.last_accepted = Some(sample.clone());
        drop(lane);

        // In-memory state is committed; everything below is fire-and-retry.
        let position = self.position_record(&sample, family_id, address);
        self.spawn_position_upsert(position);

        let emitted = self.emit_transitions(family_id, &member.display_name, &sample, transitions);

        Ok(IngestReport {
            disposition: IngestDisposition::Accepted,
            transitions: emitted,
        })
    }

    /// Re-derives containment for every subject from its last accepted
    /// sample.
    ///
    /// Containment state already reflects the last known transition, so this
    /// emits nothing unless a geofence boundary changed since the sample was
    /// evaluated. Returns the number of transitions emitted.
    pub async fn reevaluate_all(&self) -> Result<usize, EngineError> {
        let lanes: Vec<(Uuid, Arc<Mutex<SubjectLane>>)> = self
            .lanes
            .lock()
            .await
            .iter()
            .map(|(subject_id, lane)| (*subject_id, Arc::clone(lane)))
            .collect();

        let mut emitted = 0;
        for (subject_id, lane_arc) in lanes {
            let mut lane = lane_arc.lock().await;
            let sample = match lane.last_accepted.clone() {
                Some(sample) => sample,
                None => continue,
            };
            let family_id = lane.family_id;
            let snapshot = self.registry.active_for(family_id).await;
            let now = Utc::now();
            let transitions = self
                .tracker
                .evaluate(&mut lane.containment, &sample, &snapshot, now);
            if transitions.is_empty() {
                continue;
            }

            let subject_name = match self.directory.member(family_id, subject_id).await? {
                Some(member) => member.display_name,
                None => {
                    warn!(
                        subject_id = %subject_id,
                        "Subject no longer a family member; skipping re-evaluation events"
                    );
                    continue;
                }
            };
            emitted += self.emit_transitions(family_id, &subject_name, &sample, transitions);
        }
        Ok(emitted)
    }

    /// Flips the background-monitoring capability flag.
    ///
    /// Revoking authorization clears all containment state, so resumption
    /// re-derives membership from scratch and a monitoring gap can never
    /// produce a false enter or exit.
    pub async fn set_background_authorized(&self, authorized: bool) {
        let was = self
            .background_authorized
            .swap(authorized, Ordering::SeqCst);
        if was && !authorized {
            info!("Background monitoring authorization revoked; clearing containment state");
            let lanes: Vec<Arc<Mutex<SubjectLane>>> =
                self.lanes.lock().await.values().cloned().collect();
            for lane_arc in lanes {
                let mut lane = lane_arc.lock().await;
                lane.containment.clear();
                lane.last_accepted = None;
            }
        } else if !was && authorized {
            info!("Background monitoring authorized");
        }
    }

    /// Current capability flag.
    pub fn background_authorized(&self) -> bool {
        self.background_authorized.load(Ordering::SeqCst)
    }

    /// Subscribes to the registry and drops containment state promptly when
    /// a geofence is deactivated. Snapshot pruning inside the tracker covers
    /// the same ground on the next sample; this keeps the propagation delay
    /// small in between.
    pub async fn watch_registry(self: &Arc<Self>) {
        let mut subscription = self.registry.subscribe();
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match subscription.recv().await {
                    Ok(RegistryChange::Deactivated { geofence_id, .. }) => {
                        engine.drop_containment_for(geofence_id).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Registry change feed lagged; snapshot pruning covers the gap");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *self.registry_listener.lock().await = Some(handle);
    }

    /// Suspends further sample ingestion and tears down the registry
    /// listener. Pending spawned persistence is neither flushed nor
    /// cancelled.
    pub async fn shutdown(&self) {
        self.suspended.store(true, Ordering::SeqCst);
        if let Some(handle) = self.registry_listener.lock().await.take() {
            handle.abort();
        }
        info!("Location engine suspended");
    }

    /// Waits until all spawned persistence and notification tasks finish.
    pub async fn quiesce(&self) {
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn lane(&self, subject_id: Uuid, family_id: Uuid) -> Arc<Mutex<SubjectLane>> {
        let mut lanes = self.lanes.lock().await;
        Arc::clone(lanes.entry(subject_id).or_insert_with(|| {
            Arc::new(Mutex::new(SubjectLane {
                family_id,
                last_accepted: None,
                containment: HashMap::new(),
            }))
        }))
    }

    async fn drop_containment_for(&self, geofence_id: Uuid) {
        let lanes: Vec<Arc<Mutex<SubjectLane>>> =
            self.lanes.lock().await.values().cloned().collect();
        for lane_arc in lanes {
            lane_arc.lock().await.containment.remove(&geofence_id);
        }
        debug!(geofence_id = %geofence_id, "Containment state dropped for deactivated geofence");
    }

    fn position_record(
        &self,
        sample: &LocationSample,
        family_id: Uuid,
        address: Option<String>,
    ) -> LatestPosition {
        LatestPosition {
            subject_id: sample.subject_id,
            family_id,
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy_meters: sample.accuracy_meters,
            captured_at: sample.captured_at,
            address,
            battery_percent: sample.battery_percent,
            movement_flag: sample.is_moving(self.config.movement_speed_threshold_mps),
        }
    }

    fn emit_transitions(
        &self,
        family_id: Uuid,
        subject_name: &str,
        sample: &LocationSample,
        transitions: Vec<Transition>,
    ) -> usize {
        let count = transitions.len();
        for t in transitions {
            metrics::record_transition(t.transition);
            let event = GeofenceEvent {
                id: Uuid::new_v4(),
                family_id,
                subject_id: sample.subject_id,
                subject_name: subject_name.to_string(),
                geofence_id: t.geofence.id,
                geofence_name: t.geofence.name.clone(),
                transition: t.transition,
                occurred_at: sample.captured_at,
                location: EventLocation {
                    latitude: sample.latitude,
                    longitude: sample.longitude,
                    accuracy_meters: sample.accuracy_meters,
                },
            };
            let notify = match t.transition {
                GeofenceTransition::Enter => t.geofence.notify_on_enter,
                GeofenceTransition::Exit => t.geofence.notify_on_exit,
            };
            info!(
                event_id = %event.id,
                subject = %event.subject_name,
                geofence = %event.geofence_name,
                transition = %event.transition,
                "Geofence transition"
            );
            self.spawn_event_pipeline(event, notify);
        }
        count
    }

    fn spawn_position_upsert(&self, position: LatestPosition) {
        let positions = Arc::clone(&self.positions);
        self.spawn(async move {
            if let Err(e) = positions.upsert(&position).await {
                warn!(
                    subject_id = %position.subject_id,
                    error = %e,
                    "Latest position write failed; the next accepted sample supersedes it"
                );
            }
        });
    }

    fn spawn_event_pipeline(&self, event: GeofenceEvent, notify: bool) {
        let events = Arc::clone(&self.events);
        let dispatcher = Arc::clone(&self.dispatcher);
        let attempts = self.config.persist_attempts;
        let backoff = self.config.persist_backoff;
        self.spawn(async move {
            append_with_retry(events.as_ref(), &event, attempts, backoff).await;
            if notify {
                match dispatcher
                    .dispatch(TransitionNotification::from(&event))
                    .await
                {
                    DispatchResult::Delivered => {
                        debug!(event_id = %event.id, "Notification dispatched");
                    }
                    DispatchResult::Skipped => {
                        debug!(event_id = %event.id, "Notification skipped by dispatcher");
                    }
                    DispatchResult::Failed(reason) => {
                        metrics::record_notification_failure();
                        warn!(event_id = %event.id, reason = %reason, "Notification dispatch failed");
                    }
                }
            }
        });
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }
}

/// Appends an event with bounded retry. The event id is the idempotency
/// key, so a retry after an ambiguous failure can never duplicate.
async fn append_with_retry(
    store: &dyn EventStore,
    event: &GeofenceEvent,
    attempts: u32,
    backoff: Duration,
) {
    for attempt in 1..=attempts {
        match store.append(event).await {
            Ok(()) => return,
            Err(e) if attempt < attempts => {
                metrics::record_event_persist_retry();
                warn!(
                    event_id = %event.id,
                    attempt,
                    error = %e,
                    "Event append failed, retrying"
                );
                tokio::time::sleep(backoff * attempt).await;
            }
            Err(e) => {
                metrics::record_event_persist_failure();
                error!(
                    event_id = %event.id,
                    error = %e,
                    "Event append failed permanently; in-memory containment state remains authoritative"
                );
            }
        }
    }
}
