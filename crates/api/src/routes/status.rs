//! Presence status handler.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::geofence_event::SubjectStatus;

/// Current derived presence of a subject.
///
/// GET /api/v1/subjects/:subject_id/status
pub async fn current_status(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<SubjectStatus>, ApiError> {
    let status = state.aggregator.current_status(subject_id).await?;
    Ok(Json(status))
}
