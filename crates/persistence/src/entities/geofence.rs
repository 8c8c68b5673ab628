//! Geofence entity (database row mapping).
//!
//! Maps to the `geofences` table.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::geofence::Geofence;

/// Database row mapping for the geofences table.
#[derive(Debug, Clone, FromRow)]
pub struct GeofenceRow {
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub active: bool,
    pub notify_on_enter: bool,
    pub notify_on_exit: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}

impl From<GeofenceRow> for Geofence {
    fn from(row: GeofenceRow) -> Self {
        Self {
            id: row.id,
            family_id: row.family_id,
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            radius_meters: row.radius_meters,
            active: row.active,
            notify_on_enter: row.notify_on_enter,
            notify_on_exit: row.notify_on_exit,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}
