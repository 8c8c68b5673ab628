//! Geofence store backed by PostgreSQL.
//!
//! Durable sink behind the in-memory registry. Deactivation is a soft
//! delete: the row is kept with `active = false`.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::geofence::Geofence;
use engine::error::StoreError;
use engine::store::GeofenceStore;

use crate::entities::GeofenceRow;
use crate::metrics::QueryTimer;

/// PostgreSQL-backed geofence records.
pub struct PostgresGeofenceStore {
    pool: PgPool,
}

impl PostgresGeofenceStore {
    /// Create a new store instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait::async_trait]
impl GeofenceStore for PostgresGeofenceStore {
    async fn save(&self, geofence: &Geofence) -> Result<(), StoreError> {
        let timer = QueryTimer::new("save_geofence");
        let result = sqlx::query(
            r#"
            INSERT INTO geofences
                (id, family_id, name, latitude, longitude, radius_meters,
                 active, notify_on_enter, notify_on_exit, created_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                radius_meters = EXCLUDED.radius_meters,
                active = EXCLUDED.active,
                notify_on_enter = EXCLUDED.notify_on_enter,
                notify_on_exit = EXCLUDED.notify_on_exit
            "#,
        )
        .bind(geofence.id)
        .bind(geofence.family_id)
        .bind(&geofence.name)
        .bind(geofence.latitude)
        .bind(geofence.longitude)
        .bind(geofence.radius_meters)
        .bind(geofence.active)
        .bind(geofence.notify_on_enter)
        .bind(geofence.notify_on_exit)
        .bind(geofence.created_at)
        .bind(geofence.created_by)
        .execute(&self.pool)
        .await;
        timer.record();

        result.map(|_| ()).map_err(unavailable)
    }

    async fn set_active(&self, geofence_id: Uuid, active: bool) -> Result<(), StoreError> {
        let timer = QueryTimer::new("set_geofence_active");
        let result = sqlx::query(
            r#"
            UPDATE geofences
            SET active = $2
            WHERE id = $1
            "#,
        )
        .bind(geofence_id)
        .bind(active)
        .execute(&self.pool)
        .await;
        timer.record();

        result.map(|_| ()).map_err(unavailable)
    }

    async fn load_active(&self) -> Result<Vec<Geofence>, StoreError> {
        let timer = QueryTimer::new("load_active_geofences");
        let rows = sqlx::query_as::<_, GeofenceRow>(
            r#"
            SELECT id, family_id, name, latitude, longitude, radius_meters,
                   active, notify_on_enter, notify_on_exit, created_at, created_by
            FROM geofences
            WHERE active = TRUE
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(rows
            .map_err(unavailable)?
            .into_iter()
            .map(Geofence::from)
            .collect())
    }

    async fn for_family(
        &self,
        family_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<Geofence>, StoreError> {
        let timer = QueryTimer::new("geofences_for_family");
        let rows = sqlx::query_as::<_, GeofenceRow>(
            r#"
            SELECT id, family_id, name, latitude, longitude, radius_meters,
                   active, notify_on_enter, notify_on_exit, created_at, created_by
            FROM geofences
            WHERE family_id = $1 AND (active = TRUE OR $2)
            ORDER BY created_at
            "#,
        )
        .bind(family_id)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(rows
            .map_err(unavailable)?
            .into_iter()
            .map(Geofence::from)
            .collect())
    }
}
