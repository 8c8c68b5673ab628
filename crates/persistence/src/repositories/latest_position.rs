//! Latest-position store backed by PostgreSQL.
//!
//! One row per subject, UPSERTed on each accepted sample.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::location::LatestPosition;
use engine::error::StoreError;
use engine::store::LatestPositionStore;

use crate::entities::LatestPositionRow;
use crate::metrics::QueryTimer;

/// PostgreSQL-backed latest-position records.
pub struct PostgresPositionStore {
    pool: PgPool,
}

impl PostgresPositionStore {
    /// Create a new store instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait::async_trait]
impl LatestPositionStore for PostgresPositionStore {
    async fn upsert(&self, position: &LatestPosition) -> Result<(), StoreError> {
        let timer = QueryTimer::new("upsert_latest_position");
        let result = sqlx::query(
            r#"
            INSERT INTO latest_positions
                (subject_id, family_id, latitude, longitude, accuracy_meters,
                 captured_at, address, battery_percent, movement_flag, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            ON CONFLICT (subject_id) DO UPDATE SET
                family_id = EXCLUDED.family_id,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                accuracy_meters = EXCLUDED.accuracy_meters,
                captured_at = EXCLUDED.captured_at,
                address = EXCLUDED.address,
                battery_percent = EXCLUDED.battery_percent,
                movement_flag = EXCLUDED.movement_flag,
                updated_at = NOW()
            "#,
        )
        .bind(position.subject_id)
        .bind(position.family_id)
        .bind(position.latitude)
        .bind(position.longitude)
        .bind(position.accuracy_meters)
        .bind(position.captured_at)
        .bind(&position.address)
        .bind(position.battery_percent)
        .bind(position.movement_flag)
        .execute(&self.pool)
        .await;
        timer.record();

        result.map(|_| ()).map_err(unavailable)
    }

    async fn latest(&self, subject_id: Uuid) -> Result<Option<LatestPosition>, StoreError> {
        let timer = QueryTimer::new("latest_position");
        let row = sqlx::query_as::<_, LatestPositionRow>(
            r#"
            SELECT subject_id, family_id, latitude, longitude, accuracy_meters,
                   captured_at, address, battery_percent, movement_flag, updated_at
            FROM latest_positions
            WHERE subject_id = $1
            "#,
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(row.map_err(unavailable)?.map(LatestPosition::from))
    }
}
