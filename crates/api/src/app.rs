use axum::{
    middleware,
    routing::get,
    routing::post,
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use engine::store::{LatestPositionStore, StatusAggregator};
use engine::{GeofenceRegistry, LocationEngine};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{geofence_events, geofences, health, locations, monitoring, status};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LocationEngine>,
    pub registry: Arc<GeofenceRegistry>,
    pub aggregator: Arc<StatusAggregator>,
    pub positions: Arc<dyn LatestPositionStore>,
    pub config: Arc<Config>,
}

pub fn create_app(state: AppState) -> Router {
    // Position ingestion and reads, geofence commands, event history.
    // Authentication fronts this service externally; requests carry the
    // acting member for family-level authorization.
    let api_routes = Router::new()
        .route("/api/v1/locations", post(locations::ingest_sample))
        .route(
            "/api/v1/subjects/:subject_id/position",
            get(locations::latest_position),
        )
        .route(
            "/api/v1/subjects/:subject_id/status",
            get(status::current_status),
        )
        .route(
            "/api/v1/geofences",
            post(geofences::create_geofence).get(geofences::list_geofences),
        )
        .route(
            "/api/v1/geofences/:geofence_id",
            get(geofences::get_geofence)
                .patch(geofences::update_geofence)
                .delete(geofences::deactivate_geofence),
        )
        .route("/api/v1/geofence-events", get(geofence_events::list_events))
        .route(
            "/api/v1/monitoring/authorization",
            axum::routing::put(monitoring::set_authorization),
        );

    // Public routes (no state beyond health introspection)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let request_timeout = state.config.request_timeout();

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
