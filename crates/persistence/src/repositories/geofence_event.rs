//! Geofence event store backed by PostgreSQL.
//!
//! The event id is the idempotency key: `ON CONFLICT DO NOTHING` makes a
//! retried append a no-op.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::geofence_event::GeofenceEvent;
use engine::error::StoreError;
use engine::store::EventStore;

use crate::entities::GeofenceEventRow;
use crate::metrics::QueryTimer;

/// PostgreSQL-backed append-only event log.
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Create a new store instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait::async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, event: &GeofenceEvent) -> Result<(), StoreError> {
        let timer = QueryTimer::new("append_geofence_event");
        let result = sqlx::query(
            r#"
            INSERT INTO geofence_events
                (id, family_id, subject_id, subject_name, geofence_id, geofence_name,
                 event_type, occurred_at, latitude, longitude, accuracy_meters)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(event.id)
        .bind(event.family_id)
        .bind(event.subject_id)
        .bind(&event.subject_name)
        .bind(event.geofence_id)
        .bind(&event.geofence_name)
        .bind(event.transition.as_str())
        .bind(event.occurred_at)
        .bind(event.location.latitude)
        .bind(event.location.longitude)
        .bind(event.location.accuracy_meters)
        .execute(&self.pool)
        .await;
        timer.record();

        result.map(|_| ()).map_err(unavailable)
    }

    async fn latest_for_subject(
        &self,
        subject_id: Uuid,
    ) -> Result<Option<GeofenceEvent>, StoreError> {
        let timer = QueryTimer::new("latest_event_for_subject");
        let row = sqlx::query_as::<_, GeofenceEventRow>(
            r#"
            SELECT id, family_id, subject_id, subject_name, geofence_id, geofence_name,
                   event_type, occurred_at, latitude, longitude, accuracy_meters, created_at
            FROM geofence_events
            WHERE subject_id = $1
            ORDER BY occurred_at DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        row.map_err(unavailable)?.map(GeofenceEvent::try_from).transpose()
    }

    async fn recent_for_family(
        &self,
        family_id: Uuid,
        limit: i64,
    ) -> Result<Vec<GeofenceEvent>, StoreError> {
        let timer = QueryTimer::new("recent_events_for_family");
        let rows = sqlx::query_as::<_, GeofenceEventRow>(
            r#"
            SELECT id, family_id, subject_id, subject_name, geofence_id, geofence_name,
                   event_type, occurred_at, latitude, longitude, accuracy_meters, created_at
            FROM geofence_events
            WHERE family_id = $1
            ORDER BY occurred_at DESC, created_at DESC
            LIMIT $2
            "#,
        )
        .bind(family_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        rows.map_err(unavailable)?
            .into_iter()
            .map(GeofenceEvent::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_store_new() {
        // The store wraps a pool; behavior is exercised by integration
        // tests against a live database.
    }
}
