//! Notification dispatch contract.
//!
//! The engine calls a dispatcher exactly once per emitted transition event
//! whose geofence has the matching notification flag set. Delivery mechanics
//! (push tokens, retry queues) are an external concern; implementations here
//! are thin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::geofence_event::{GeofenceEvent, GeofenceTransition};

/// Payload handed to the dispatcher for one transition event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionNotification {
    pub family_id: Uuid,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub geofence_id: Uuid,
    pub geofence_name: String,
    pub transition: GeofenceTransition,
    pub occurred_at: DateTime<Utc>,
}

impl From<&GeofenceEvent> for TransitionNotification {
    fn from(event: &GeofenceEvent) -> Self {
        Self {
            family_id: event.family_id,
            subject_id: event.subject_id,
            subject_name: event.subject_name.clone(),
            geofence_id: event.geofence_id,
            geofence_name: event.geofence_name.clone(),
            transition: event.transition,
            occurred_at: event.occurred_at,
        }
    }
}

/// Result of a dispatch attempt.
#[derive(Debug, Clone)]
pub enum DispatchResult {
    /// Notification was handed off successfully.
    Delivered,
    /// Dispatcher chose not to deliver (e.g. delivery disabled).
    Skipped,
    /// Delivery failed. Logged by the caller; never affects event durability
    /// or containment state.
    Failed(String),
}

/// Dispatcher trait for transition notifications.
#[async_trait::async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver one transition notification.
    async fn dispatch(&self, notification: TransitionNotification) -> DispatchResult;
}

/// Logging dispatcher for development and testing.
///
/// Logs notifications but doesn't actually deliver them.
#[derive(Debug, Clone, Default)]
pub struct LogDispatcher {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
}

impl LogDispatcher {
    /// Create a new logging dispatcher.
    pub fn new() -> Self {
        Self {
            simulate_failure: false,
        }
    }

    /// Create a dispatcher that simulates failures.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
        }
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, notification: TransitionNotification) -> DispatchResult {
        if self.simulate_failure {
            tracing::warn!(
                subject_id = %notification.subject_id,
                geofence_id = %notification.geofence_id,
                "Log dispatcher simulating failure"
            );
            return DispatchResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            family_id = %notification.family_id,
            subject = %notification.subject_name,
            geofence = %notification.geofence_name,
            transition = %notification.transition,
            occurred_at = %notification.occurred_at,
            "Would deliver transition notification"
        );

        DispatchResult::Delivered
    }
}
