//! Engine metrics collection.

use metrics::counter;

use domain::models::geofence_event::GeofenceTransition;

/// Record a sample accepted by the significance filter.
pub fn record_sample_accepted() {
    counter!("samples_accepted_total").increment(1);
}

/// Record a sample dropped by the significance filter.
pub fn record_sample_rejected(reason: &'static str) {
    counter!("samples_rejected_total", "reason" => reason).increment(1);
}

/// Record a sample handled informational-only (monitoring unauthorized).
pub fn record_sample_informational() {
    counter!("samples_informational_total").increment(1);
}

/// Record an emitted transition event.
pub fn record_transition(transition: GeofenceTransition) {
    counter!("transitions_emitted_total", "type" => transition.as_str()).increment(1);
}

/// Record a retried event append.
pub fn record_event_persist_retry() {
    counter!("event_persist_retries_total").increment(1);
}

/// Record a permanently failed event append.
pub fn record_event_persist_failure() {
    counter!("event_persist_failures_total").increment(1);
}

/// Record a failed notification dispatch.
pub fn record_notification_failure() {
    counter!("notification_failures_total").increment(1);
}

/// Record a persisted record that failed to decode.
pub fn record_decode_failure(field: &'static str) {
    counter!("store_decode_failures_total", "field" => field).increment(1);
}
