//! Geofence domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A named circular region owned by a family.
///
/// Deactivation is a soft delete: `active` flips to false and the record is
/// kept so historical events remain attributable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
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

/// Default notification flags for new geofences.
fn default_notify() -> bool {
    true
}

/// Request payload for creating a geofence.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGeofenceRequest {
    pub family_id: Uuid,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(custom(function = "shared::validation::validate_radius"))]
    pub radius_meters: f64,

    #[serde(default = "default_notify")]
    pub notify_on_enter: bool,

    #[serde(default = "default_notify")]
    pub notify_on_exit: bool,

    /// Family member issuing the command.
    pub created_by: Uuid,
}

/// Request payload for updating a geofence (partial update).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGeofenceRequest {
    /// Family member issuing the command.
    pub acting_member_id: Uuid,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_radius"))]
    pub radius_meters: Option<f64>,

    pub notify_on_enter: Option<bool>,

    pub notify_on_exit: Option<bool>,
}

/// Query parameters for deactivating a geofence.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateGeofenceQuery {
    pub acting_member_id: Uuid,
}

/// Query parameters for listing geofences.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGeofencesQuery {
    pub family_id: Uuid,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Response payload for geofence operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceResponse {
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

impl From<Geofence> for GeofenceResponse {
    fn from(g: Geofence) -> Self {
        Self {
            id: g.id,
            family_id: g.family_id,
            name: g.name,
            latitude: g.latitude,
            longitude: g.longitude,
            radius_meters: g.radius_meters,
            active: g.active,
            notify_on_enter: g.notify_on_enter,
            notify_on_exit: g.notify_on_exit,
            created_at: g.created_at,
            created_by: g.created_by,
        }
    }
}

/// Response for listing geofences.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGeofencesResponse {
    pub geofences: Vec<GeofenceResponse>,
    pub total: usize,
}
