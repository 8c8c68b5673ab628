//! Latest-position entity (database row mapping).
//!
//! Maps to the `latest_positions` table: one row per subject, overwritten
//! on each accepted sample.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::location::LatestPosition;

/// Database row mapping for the latest_positions table.
#[derive(Debug, Clone, FromRow)]
pub struct LatestPositionRow {
    pub subject_id: Uuid,
    pub family_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub captured_at: DateTime<Utc>,
    pub address: Option<String>,
    pub battery_percent: Option<i32>,
    pub movement_flag: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<LatestPositionRow> for LatestPosition {
    fn from(row: LatestPositionRow) -> Self {
        Self {
            subject_id: row.subject_id,
            family_id: row.family_id,
            latitude: row.latitude,
            longitude: row.longitude,
            accuracy_meters: row.accuracy_meters,
            captured_at: row.captured_at,
            address: row.address,
            battery_percent: row.battery_percent,
            movement_flag: row.movement_flag,
        }
    }
}
