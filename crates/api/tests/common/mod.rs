//! Common test utilities for integration tests.
//!
//! Builds the router over in-memory backends so tests drive the full HTTP
//! surface without a database.

// Helper utilities intentionally available to all integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use tower::ServiceExt;
use uuid::Uuid;

use domain::models::family::{FamilyMember, MemberRole};
use domain::services::dispatch::LogDispatcher;
use engine::store::memory::{InMemoryEventStore, InMemoryGeofenceStore, InMemoryPositionStore};
use engine::store::StatusAggregator;
use engine::{EngineConfig, GeofenceRegistry, InMemoryFamilyDirectory, LocationEngine};

use family_locator_api::app::{create_app, AppState};
use family_locator_api::config::Config;

pub struct TestApp {
    pub app: Router,
    pub engine: Arc<LocationEngine>,
    pub events: Arc<InMemoryEventStore>,
    pub family_id: Uuid,
    pub parent_id: Uuid,
    pub child_id: Uuid,
}

/// Builds an app with one family: a parent ("Jordan") and a child ("Sam").
pub async fn spawn_app() -> TestApp {
    let config =
        Config::load_for_test(&[("database.url", "postgres://unused")]).expect("test config");

    let directory = Arc::new(InMemoryFamilyDirectory::new());
    let family_id = Uuid::new_v4();
    let parent_id = Uuid::new_v4();
    let child_id = Uuid::new_v4();

    directory
        .add_member(FamilyMember {
            family_id,
            user_id: parent_id,
            display_name: "Jordan".to_string(),
            role: MemberRole::Parent,
            joined_at: Utc::now(),
        })
        .await;
    directory
        .add_member(FamilyMember {
            family_id,
            user_id: child_id,
            display_name: "Sam".to_string(),
            role: MemberRole::Child,
            joined_at: Utc::now(),
        })
        .await;

    let registry = Arc::new(GeofenceRegistry::new(
        directory.clone(),
        Arc::new(InMemoryGeofenceStore::new()),
    ));
    let events = Arc::new(InMemoryEventStore::new());
    let positions = Arc::new(InMemoryPositionStore::new());

    let engine = Arc::new(LocationEngine::new(
        EngineConfig::default(),
        registry.clone(),
        directory,
        events.clone(),
        positions.clone(),
        Arc::new(LogDispatcher::new()),
    ));
    engine.watch_registry().await;

    let state = AppState {
        engine: engine.clone(),
        registry,
        aggregator: Arc::new(StatusAggregator::new(events.clone())),
        positions,
        config: Arc::new(config),
    };

    TestApp {
        app: create_app(state),
        engine,
        events,
        family_id,
        parent_id,
        child_id,
    }
}

/// Sends one request and returns status plus parsed JSON body (Null when
/// the body is empty).
pub async fn request_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}
