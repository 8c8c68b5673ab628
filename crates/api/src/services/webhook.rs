//! Webhook notification dispatcher.
//!
//! Thin implementation of the consumed dispatch interface: one POST of the
//! transition payload per notification. Delivery pipelines (retry queues,
//! push tokens) belong to the receiving system.

use std::time::Duration;

use domain::services::dispatch::{DispatchResult, NotificationDispatcher, TransitionNotification};

/// Dispatcher POSTing transition notifications to a configured endpoint.
pub struct WebhookDispatcher {
    client: reqwest::Client,
    url: String,
}

impl WebhookDispatcher {
    /// Create a dispatcher for the given endpoint.
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn dispatch(&self, notification: TransitionNotification) -> DispatchResult {
        let response = self
            .client
            .post(&self.url)
            .json(&notification)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(
                    subject = %notification.subject_name,
                    geofence = %notification.geofence_name,
                    transition = %notification.transition,
                    "Webhook notification delivered"
                );
                DispatchResult::Delivered
            }
            Ok(response) => DispatchResult::Failed(format!(
                "webhook returned status {}",
                response.status()
            )),
            Err(e) => DispatchResult::Failed(e.to_string()),
        }
    }
}
