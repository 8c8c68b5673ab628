use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use domain::services::dispatch::{LogDispatcher, NotificationDispatcher};
use engine::directory::FamilyDirectory;
use engine::store::{EventStore, GeofenceStore, LatestPositionStore, StatusAggregator};
use engine::{GeofenceRegistry, LocationEngine};
use persistence::repositories::{
    PostgresEventStore, PostgresFamilyDirectory, PostgresGeofenceStore, PostgresPositionStore,
};

use family_locator_api::app::{create_app, AppState};
use family_locator_api::config::Config;
use family_locator_api::jobs::{JobScheduler, PoolMetricsJob, ReevaluateContainmentJob};
use family_locator_api::middleware;
use family_locator_api::services::WebhookDispatcher;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    middleware::logging::init_logging(&config.logging);

    info!("Starting Family Locator API v{}", env!("CARGO_PKG_VERSION"));

    middleware::metrics::init_metrics().map_err(anyhow::Error::msg)?;

    let pool = persistence::db::create_pool(&config.database_config()).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/migrations").run(&pool).await?;
    info!("Migrations completed");

    // Storage backends and the membership directory
    let directory: Arc<dyn FamilyDirectory> = Arc::new(PostgresFamilyDirectory::new(pool.clone()));
    let geofence_store: Arc<dyn GeofenceStore> =
        Arc::new(PostgresGeofenceStore::new(pool.clone()));
    let events: Arc<dyn EventStore> = Arc::new(PostgresEventStore::new(pool.clone()));
    let positions: Arc<dyn LatestPositionStore> =
        Arc::new(PostgresPositionStore::new(pool.clone()));

    let dispatcher: Arc<dyn NotificationDispatcher> = if config.dispatch.webhook_url.is_empty() {
        info!("No webhook configured; transition notifications will be logged only");
        Arc::new(LogDispatcher::new())
    } else {
        Arc::new(WebhookDispatcher::new(
            config.dispatch.webhook_url.clone(),
            Duration::from_millis(config.dispatch.timeout_ms),
        )?)
    };

    // Registry and engine
    let registry = Arc::new(GeofenceRegistry::new(
        Arc::clone(&directory),
        geofence_store,
    ));
    registry.hydrate().await?;

    let engine = Arc::new(LocationEngine::new(
        config.engine_config(),
        Arc::clone(&registry),
        directory,
        Arc::clone(&events),
        Arc::clone(&positions),
        dispatcher,
    ));
    engine.watch_registry().await;

    // Background jobs
    let mut scheduler = JobScheduler::new();
    scheduler.register(ReevaluateContainmentJob::new(
        Arc::clone(&engine),
        config.engine.reevaluate_interval_minutes,
    ));
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    scheduler.start();

    let state = AppState {
        engine: Arc::clone(&engine),
        registry,
        aggregator: Arc::new(StatusAggregator::new(events)),
        positions,
        config: Arc::new(config.clone()),
    };
    let app = create_app(state);

    let addr = config.socket_addr()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;
    engine.shutdown().await;

    Ok(())
}
