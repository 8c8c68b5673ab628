//! In-memory storage backends.
//!
//! Used by tests and by single-node deployments without a database. The
//! event log keeps insertion order; reads sort by occurrence time with
//! insertion order as the tiebreaker.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use uuid::Uuid;

use domain::models::geofence::Geofence;
use domain::models::geofence_event::GeofenceEvent;
use domain::models::location::LatestPosition;

use crate::error::StoreError;
use crate::store::{EventStore, GeofenceStore, LatestPositionStore};

/// In-memory append-only event log with idempotent appends.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: RwLock<EventLog>,
}

#[derive(Default)]
struct EventLog {
    events: Vec<GeofenceEvent>,
    seen: HashSet<Uuid>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events. Duplicated appends do not count.
    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.events.is_empty()
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: &GeofenceEvent) -> Result<(), StoreError> {
        let mut log = self.inner.write().await;
        if !log.seen.insert(event.id) {
            return Ok(());
        }
        log.events.push(event.clone());
        Ok(())
    }

    async fn latest_for_subject(
        &self,
        subject_id: Uuid,
    ) -> Result<Option<GeofenceEvent>, StoreError> {
        let log = self.inner.read().await;
        Ok(log
            .events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.subject_id == subject_id)
            .max_by_key(|(idx, e)| (e.occurred_at, *idx))
            .map(|(_, e)| e.clone()))
    }

    async fn recent_for_family(
        &self,
        family_id: Uuid,
        limit: i64,
    ) -> Result<Vec<GeofenceEvent>, StoreError> {
        let log = self.inner.read().await;
        let mut events: Vec<(usize, &GeofenceEvent)> = log
            .events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.family_id == family_id)
            .collect();
        events.sort_by_key(|(idx, e)| std::cmp::Reverse((e.occurred_at, *idx)));
        Ok(events
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

/// In-memory latest-position record per subject.
#[derive(Default)]
pub struct InMemoryPositionStore {
    positions: RwLock<HashMap<Uuid, LatestPosition>>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl LatestPositionStore for InMemoryPositionStore {
    async fn upsert(&self, position: &LatestPosition) -> Result<(), StoreError> {
        self.positions
            .write()
            .await
            .insert(position.subject_id, position.clone());
        Ok(())
    }

    async fn latest(&self, subject_id: Uuid) -> Result<Option<LatestPosition>, StoreError> {
        Ok(self.positions.read().await.get(&subject_id).cloned())
    }
}

/// In-memory geofence records, including deactivated ones.
#[derive(Default)]
pub struct InMemoryGeofenceStore {
    geofences: RwLock<HashMap<Uuid, Geofence>>,
}

impl InMemoryGeofenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl GeofenceStore for InMemoryGeofenceStore {
    async fn save(&self, geofence: &Geofence) -> Result<(), StoreError> {
        self.geofences
            .write()
            .await
            .insert(geofence.id, geofence.clone());
        Ok(())
    }

    async fn set_active(&self, geofence_id: Uuid, active: bool) -> Result<(), StoreError> {
        if let Some(geofence) = self.geofences.write().await.get_mut(&geofence_id) {
            geofence.active = active;
        }
        Ok(())
    }

    async fn load_active(&self) -> Result<Vec<Geofence>, StoreError> {
        Ok(self
            .geofences
            .read()
            .await
            .values()
            .filter(|g| g.active)
            .cloned()
            .collect())
    }

    async fn for_family(
        &self,
        family_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<Geofence>, StoreError> {
        let mut geofences: Vec<Geofence> = self
            .geofences
            .read()
            .await
            .values()
            .filter(|g| g.family_id == family_id && (include_inactive || g.active))
            .cloned()
            .collect();
        geofences.sort_by_key(|g| g.created_at);
        Ok(geofences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use domain::models::geofence_event::{EventLocation, GeofenceTransition};

    fn event(subject_id: Uuid, occurred_at: chrono::DateTime<Utc>) -> GeofenceEvent {
        GeofenceEvent {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            subject_id,
            subject_name: "Sam".to_string(),
            geofence_id: Uuid::new_v4(),
            geofence_name: "Home".to_string(),
            transition: GeofenceTransition::Enter,
            occurred_at,
            location: EventLocation {
                latitude: 40.0,
                longitude: -73.0,
                accuracy_meters: 10.0,
            },
        }
    }

    fn geofence(family_id: Uuid, name: &str, active: bool) -> Geofence {
        Geofence {
            id: Uuid::new_v4(),
            family_id,
            name: name.to_string(),
            latitude: 40.0,
            longitude: -73.0,
            radius_meters: 100.0,
            active,
            notify_on_enter: true,
            notify_on_exit: true,
            created_at: Utc::now(),
            created_by: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_append_is_idempotent_on_id() {
        let store = InMemoryEventStore::new();
        let e = event(Uuid::new_v4(), Utc::now());

        store.append(&e).await.unwrap();
        store.append(&e).await.unwrap();
        store.append(&e).await.unwrap();

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_latest_for_subject_orders_by_time() {
        let store = InMemoryEventStore::new();
        let subject = Uuid::new_v4();
        let t0 = Utc::now();

        let newer = event(subject, t0 + Duration::minutes(1));
        let older = event(subject, t0);
        // Insert newer first; time ordering must still win.
        store.append(&newer).await.unwrap();
        store.append(&older).await.unwrap();

        let latest = store.latest_for_subject(subject).await.unwrap().unwrap();
        assert_eq!(latest.id, newer.id);
    }

    #[tokio::test]
    async fn test_latest_for_subject_tie_breaks_by_insertion() {
        let store = InMemoryEventStore::new();
        let subject = Uuid::new_v4();
        let at = Utc::now();

        let first = event(subject, at);
        let second = event(subject, at);
        store.append(&first).await.unwrap();
        store.append(&second).await.unwrap();

        let latest = store.latest_for_subject(subject).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn test_recent_for_family_descending_and_limited() {
        let store = InMemoryEventStore::new();
        let family = Uuid::new_v4();
        let t0 = Utc::now();

        for i in 0..5 {
            let mut e = event(Uuid::new_v4(), t0 + Duration::seconds(i));
            e.family_id = family;
            store.append(&e).await.unwrap();
        }
        // A different family's event must not leak in.
        store.append(&event(Uuid::new_v4(), t0)).await.unwrap();

        let events = store.recent_for_family(family, 3).await.unwrap();
        assert_eq!(events.len(), 3);
        assert!(events[0].occurred_at >= events[1].occurred_at);
        assert!(events[1].occurred_at >= events[2].occurred_at);
        assert!(events.iter().all(|e| e.family_id == family));
    }

    #[tokio::test]
    async fn test_position_upsert_overwrites() {
        let store = InMemoryPositionStore::new();
        let subject = Uuid::new_v4();
        let family = Uuid::new_v4();

        let mut position = LatestPosition {
            subject_id: subject,
            family_id: family,
            latitude: 40.0,
            longitude: -73.0,
            accuracy_meters: 10.0,
            captured_at: Utc::now(),
            address: None,
            battery_percent: Some(90),
            movement_flag: false,
        };
        store.upsert(&position).await.unwrap();

        position.latitude = 41.0;
        position.battery_percent = Some(85);
        store.upsert(&position).await.unwrap();

        let latest = store.latest(subject).await.unwrap().unwrap();
        assert_eq!(latest.latitude, 41.0);
        assert_eq!(latest.battery_percent, Some(85));
    }

    #[tokio::test]
    async fn test_geofence_store_active_filtering() {
        let store = InMemoryGeofenceStore::new();
        let family = Uuid::new_v4();

        let active = geofence(family, "Home", true);
        let inactive = geofence(family, "Old school", false);
        store.save(&active).await.unwrap();
        store.save(&inactive).await.unwrap();

        let loaded = store.load_active().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, active.id);

        let all = store.for_family(family, true).await.unwrap();
        assert_eq!(all.len(), 2);

        let active_only = store.for_family(family, false).await.unwrap();
        assert_eq!(active_only.len(), 1);
    }

    #[tokio::test]
    async fn test_geofence_store_set_active() {
        let store = InMemoryGeofenceStore::new();
        let family = Uuid::new_v4();
        let g = geofence(family, "Home", true);
        store.save(&g).await.unwrap();

        store.set_active(g.id, false).await.unwrap();
        assert!(store.load_active().await.unwrap().is_empty());

        // Unknown id is a no-op.
        store.set_active(Uuid::new_v4(), false).await.unwrap();
    }
}
