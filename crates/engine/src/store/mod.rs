//! Storage traits and the status aggregator.
//!
//! The engine's in-memory containment state is authoritative; these traits
//! are the durable sinks and read models behind it. In-memory
//! implementations live in [`memory`]; PostgreSQL implementations live in
//! the `persistence` crate.

pub mod memory;

use uuid::Uuid;

use domain::models::geofence::Geofence;
use domain::models::geofence_event::{GeofenceEvent, GeofenceTransition, SubjectStatus};
use domain::models::location::LatestPosition;

use crate::error::StoreError;

pub use memory::{InMemoryEventStore, InMemoryGeofenceStore, InMemoryPositionStore};

/// Append-only geofence event log.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Appends an event, keyed on `event.id` for idempotency: appending an
    /// id that is already present is a no-op, not an error.
    async fn append(&self, event: &GeofenceEvent) -> Result<(), StoreError>;

    /// The chronologically last event for a subject.
    async fn latest_for_subject(
        &self,
        subject_id: Uuid,
    ) -> Result<Option<GeofenceEvent>, StoreError>;

    /// The most recent events for a family, descending by occurrence time.
    async fn recent_for_family(
        &self,
        family_id: Uuid,
        limit: i64,
    ) -> Result<Vec<GeofenceEvent>, StoreError>;
}

/// Latest-position record per subject, overwritten on each accepted sample.
#[async_trait::async_trait]
pub trait LatestPositionStore: Send + Sync {
    async fn upsert(&self, position: &LatestPosition) -> Result<(), StoreError>;

    async fn latest(&self, subject_id: Uuid) -> Result<Option<LatestPosition>, StoreError>;
}

/// Durable sink for geofence records.
#[async_trait::async_trait]
pub trait GeofenceStore: Send + Sync {
    /// Creates or replaces a geofence record.
    async fn save(&self, geofence: &Geofence) -> Result<(), StoreError>;

    /// Flips the active flag. Unknown ids are a no-op.
    async fn set_active(&self, geofence_id: Uuid, active: bool) -> Result<(), StoreError>;

    /// All active geofences, for registry hydration at startup.
    async fn load_active(&self) -> Result<Vec<Geofence>, StoreError>;

    /// Geofences of one family, optionally including deactivated ones.
    async fn for_family(
        &self,
        family_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<Geofence>, StoreError>;
}

/// Derived presence view over the event log.
///
/// A pure read layer: nothing here is separately mutated.
pub struct StatusAggregator {
    events: std::sync::Arc<dyn EventStore>,
}

impl StatusAggregator {
    pub fn new(events: std::sync::Arc<dyn EventStore>) -> Self {
        Self { events }
    }

    /// Presence of a subject, derived from the last event alone: inside G
    /// since t iff the last event is an `enter` for G at t.
    pub async fn current_status(&self, subject_id: Uuid) -> Result<SubjectStatus, StoreError> {
        match self.events.latest_for_subject(subject_id).await? {
            Some(event) if event.transition == GeofenceTransition::Enter => {
                Ok(SubjectStatus::Inside {
                    geofence_id: event.geofence_id,
                    geofence_name: event.geofence_name,
                    since: event.occurred_at,
                })
            }
            _ => Ok(SubjectStatus::Outside),
        }
    }

    /// Recent events for a family, newest first. The limit is clamped.
    pub async fn recent_events(
        &self,
        family_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<GeofenceEvent>, StoreError> {
        let limit = shared::pagination::effective_limit(limit);
        self.events.recent_for_family(family_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use domain::models::geofence_event::EventLocation;
    use std::sync::Arc;

    fn event(
        subject_id: Uuid,
        family_id: Uuid,
        geofence_id: Uuid,
        transition: GeofenceTransition,
        occurred_at: chrono::DateTime<Utc>,
    ) -> GeofenceEvent {
        GeofenceEvent {
            id: Uuid::new_v4(),
            family_id,
            subject_id,
            subject_name: "Sam".to_string(),
            geofence_id,
            geofence_name: "Home".to_string(),
            transition,
            occurred_at,
            location: EventLocation {
                latitude: 40.0,
                longitude: -73.0,
                accuracy_meters: 10.0,
            },
        }
    }

    #[tokio::test]
    async fn test_status_outside_when_no_events() {
        let store = Arc::new(InMemoryEventStore::new());
        let aggregator = StatusAggregator::new(store);
        let status = aggregator.current_status(Uuid::new_v4()).await.unwrap();
        assert_eq!(status, SubjectStatus::Outside);
    }

    #[tokio::test]
    async fn test_status_inside_after_enter() {
        let store = Arc::new(InMemoryEventStore::new());
        let subject = Uuid::new_v4();
        let family = Uuid::new_v4();
        let geofence = Uuid::new_v4();
        let at = Utc::now();

        store
            .append(&event(subject, family, geofence, GeofenceTransition::Enter, at))
            .await
            .unwrap();

        let aggregator = StatusAggregator::new(store);
        match aggregator.current_status(subject).await.unwrap() {
            SubjectStatus::Inside {
                geofence_id, since, ..
            } => {
                assert_eq!(geofence_id, geofence);
                assert_eq!(since, at);
            }
            other => panic!("expected inside, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_outside_after_exit() {
        let store = Arc::new(InMemoryEventStore::new());
        let subject = Uuid::new_v4();
        let family = Uuid::new_v4();
        let geofence = Uuid::new_v4();
        let t0 = Utc::now();

        store
            .append(&event(subject, family, geofence, GeofenceTransition::Enter, t0))
            .await
            .unwrap();
        store
            .append(&event(
                subject,
                family,
                geofence,
                GeofenceTransition::Exit,
                t0 + Duration::minutes(5),
            ))
            .await
            .unwrap();

        let aggregator = StatusAggregator::new(store);
        assert_eq!(
            aggregator.current_status(subject).await.unwrap(),
            SubjectStatus::Outside
        );
    }

    #[tokio::test]
    async fn test_enter_without_exit_reads_inside_indefinitely() {
        // The derivation deliberately has no expiry: a missing exit keeps
        // the subject inside until a later event says otherwise.
        let store = Arc::new(InMemoryEventStore::new());
        let subject = Uuid::new_v4();
        let long_ago = Utc::now() - Duration::days(30);

        store
            .append(&event(
                subject,
                Uuid::new_v4(),
                Uuid::new_v4(),
                GeofenceTransition::Enter,
                long_ago,
            ))
            .await
            .unwrap();

        let aggregator = StatusAggregator::new(store);
        assert!(matches!(
            aggregator.current_status(subject).await.unwrap(),
            SubjectStatus::Inside { .. }
        ));
    }

    #[tokio::test]
    async fn test_recent_events_clamps_limit() {
        let store = Arc::new(InMemoryEventStore::new());
        let family = Uuid::new_v4();
        let t0 = Utc::now();
        for i in 0..300 {
            store
                .append(&event(
                    Uuid::new_v4(),
                    family,
                    Uuid::new_v4(),
                    GeofenceTransition::Enter,
                    t0 + Duration::seconds(i),
                ))
                .await
                .unwrap();
        }

        let aggregator = StatusAggregator::new(store);
        let events = aggregator
            .recent_events(family, Some(10_000))
            .await
            .unwrap();
        assert_eq!(events.len() as i64, shared::pagination::MAX_LIMIT);
        // Newest first.
        assert!(events[0].occurred_at > events[1].occurred_at);
    }
}
