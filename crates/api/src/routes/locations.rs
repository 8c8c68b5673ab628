//! Location ingestion and latest-position handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::location::{
    IngestSampleRequest, IngestSampleResponse, LatestPositionResponse,
};

/// Ingest one raw position fix.
///
/// POST /api/v1/locations
pub async fn ingest_sample(
    State(state): State<AppState>,
    Json(request): Json<IngestSampleRequest>,
) -> Result<Json<IngestSampleResponse>, ApiError> {
    request.validate()?;

    let address = request.address.clone();
    let sample = request
        .into_sample()
        .ok_or_else(|| ApiError::Validation("capturedAt is out of range".into()))?;

    let report = state.engine.ingest(sample, address).await?;

    Ok(Json(IngestSampleResponse {
        disposition: report.disposition,
        transitions: report.transitions,
    }))
}

/// Latest known position of a subject.
///
/// GET /api/v1/subjects/:subject_id/position
pub async fn latest_position(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<LatestPositionResponse>, ApiError> {
    let position = state
        .positions
        .latest(subject_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No position recorded for subject".into()))?;

    Ok(Json(position.into()))
}
