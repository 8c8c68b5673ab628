//! Background-monitoring capability flag handler.
//!
//! The permission provider reports whether background monitoring is
//! currently authorized. With the flag off, samples are recorded for
//! display only; flipping it off clears containment state so resumption
//! re-derives membership from scratch.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;

use crate::app::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringAuthorizationRequest {
    pub authorized: bool,
}

/// Update the background-monitoring capability flag.
///
/// PUT /api/v1/monitoring/authorization
pub async fn set_authorization(
    State(state): State<AppState>,
    Json(request): Json<MonitoringAuthorizationRequest>,
) -> StatusCode {
    info!(authorized = request.authorized, "Monitoring authorization updated");
    state
        .engine
        .set_background_authorized(request.authorized)
        .await;
    StatusCode::NO_CONTENT
}
