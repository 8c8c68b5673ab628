//! Geofence command and read handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::geofence::{
    CreateGeofenceRequest, DeactivateGeofenceQuery, GeofenceResponse, ListGeofencesQuery,
    ListGeofencesResponse, UpdateGeofenceRequest,
};

/// Create a new geofence.
///
/// POST /api/v1/geofences
pub async fn create_geofence(
    State(state): State<AppState>,
    Json(request): Json<CreateGeofenceRequest>,
) -> Result<(StatusCode, Json<GeofenceResponse>), ApiError> {
    request.validate()?;

    let geofence = state.registry.create(request).await?;

    info!(
        geofence_id = %geofence.id,
        family_id = %geofence.family_id,
        name = %geofence.name,
        "Geofence created"
    );
    Ok((StatusCode::CREATED, Json(geofence.into())))
}

/// List geofences for a family.
///
/// GET /api/v1/geofences?familyId=<uuid>
pub async fn list_geofences(
    State(state): State<AppState>,
    Query(query): Query<ListGeofencesQuery>,
) -> Result<Json<ListGeofencesResponse>, ApiError> {
    let geofences = state
        .registry
        .list_for_family(query.family_id, query.include_inactive)
        .await?;

    let geofences: Vec<GeofenceResponse> = geofences.into_iter().map(Into::into).collect();
    let total = geofences.len();

    Ok(Json(ListGeofencesResponse { geofences, total }))
}

/// Get a single active geofence by ID.
///
/// GET /api/v1/geofences/:geofence_id
pub async fn get_geofence(
    State(state): State<AppState>,
    Path(geofence_id): Path<Uuid>,
) -> Result<Json<GeofenceResponse>, ApiError> {
    let geofence = state
        .registry
        .get_active(geofence_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Geofence not found".into()))?;

    Ok(Json(geofence.into()))
}

/// Update a geofence (partial update).
///
/// PATCH /api/v1/geofences/:geofence_id
pub async fn update_geofence(
    State(state): State<AppState>,
    Path(geofence_id): Path<Uuid>,
    Json(request): Json<UpdateGeofenceRequest>,
) -> Result<Json<GeofenceResponse>, ApiError> {
    request.validate()?;

    let geofence = state.registry.update(geofence_id, request).await?;

    info!(geofence_id = %geofence.id, "Geofence updated");
    Ok(Json(geofence.into()))
}

/// Deactivate a geofence (soft delete).
///
/// DELETE /api/v1/geofences/:geofence_id?actingMemberId=<uuid>
pub async fn deactivate_geofence(
    State(state): State<AppState>,
    Path(geofence_id): Path<Uuid>,
    Query(query): Query<DeactivateGeofenceQuery>,
) -> Result<StatusCode, ApiError> {
    state
        .registry
        .deactivate(geofence_id, query.acting_member_id)
        .await?;

    info!(geofence_id = %geofence_id, "Geofence deactivated");
    Ok(StatusCode::NO_CONTENT)
}
