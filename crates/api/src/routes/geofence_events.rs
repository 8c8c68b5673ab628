//! Geofence event history handler.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::geofence_event::{
    GeofenceEventResponse, ListEventsQuery, ListEventsResponse,
};

/// Recent transition events for a family, newest first.
///
/// GET /api/v1/geofence-events?familyId=<uuid>&limit=<n>
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<ListEventsResponse>, ApiError> {
    let events = state
        .aggregator
        .recent_events(query.family_id, query.limit)
        .await?;

    let events: Vec<GeofenceEventResponse> = events.into_iter().map(Into::into).collect();
    let total = events.len();

    Ok(Json(ListEventsResponse { events, total }))
}
