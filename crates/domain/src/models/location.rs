//! Location sample and latest-position domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A raw position fix for a subject.
///
/// Samples are ephemeral input: only the latest accepted position per subject
/// is persisted, as a [`LatestPosition`] record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub subject_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub speed_mps: Option<f64>,
    pub captured_at: DateTime<Utc>,
    pub battery_percent: Option<i32>,
}

impl LocationSample {
    /// Whether the sample indicates the subject is in motion.
    ///
    /// Missing speed reads as stationary.
    pub fn is_moving(&self, threshold_mps: f64) -> bool {
        self.speed_mps.map(|s| s > threshold_mps).unwrap_or(false)
    }
}

/// Latest known position for a subject.
///
/// One logical record per subject, overwritten on each accepted sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPosition {
    pub subject_id: Uuid,
    pub family_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub captured_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_percent: Option<i32>,
    pub movement_flag: bool,
}

/// Request payload for ingesting a location sample.
///
/// POST /api/v1/locations
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IngestSampleRequest {
    pub subject_id: Uuid,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(custom(function = "shared::validation::validate_accuracy"))]
    pub accuracy_meters: f64,

    #[validate(custom(function = "shared::validation::validate_speed"))]
    pub speed_mps: Option<f64>,

    /// Capture timestamp in milliseconds since epoch.
    #[validate(custom(function = "shared::validation::validate_captured_at"))]
    pub captured_at: i64,

    #[validate(custom(function = "shared::validation::validate_battery_percent"))]
    pub battery_percent: Option<i32>,

    /// Reverse-geocoded address supplied by the client, if any. Passed
    /// through to the latest-position record untouched.
    pub address: Option<String>,
}

impl IngestSampleRequest {
    /// Converts the request into a domain sample.
    ///
    /// Returns `None` for a timestamp outside the representable range; range
    /// policy itself is enforced by validation before this point.
    pub fn into_sample(self) -> Option<LocationSample> {
        let captured_at = DateTime::from_timestamp_millis(self.captured_at)?;
        Some(LocationSample {
            subject_id: self.subject_id,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy_meters: self.accuracy_meters,
            speed_mps: self.speed_mps,
            captured_at,
            battery_percent: self.battery_percent,
        })
    }
}

/// Outcome of ingesting a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestDisposition {
    /// Sample passed the significance filter and was evaluated.
    Accepted,
    /// Sample was dropped by the significance filter. Not an error.
    Rejected,
    /// Background monitoring is not authorized; the position was recorded
    /// for display only and containment was not evaluated.
    Informational,
}

/// Response payload for sample ingestion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSampleResponse {
    pub disposition: IngestDisposition,
    /// Number of transition events the sample produced.
    pub transitions: usize,
}

/// Response payload for the latest-position read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPositionResponse {
    pub subject_id: Uuid,
    pub family_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub captured_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_percent: Option<i32>,
    pub movement_flag: bool,
}

impl From<LatestPosition> for LatestPositionResponse {
    fn from(p: LatestPosition) -> Self {
        Self {
            subject_id: p.subject_id,
            family_id: p.family_id,
            latitude: p.latitude,
            longitude: p.longitude,
            accuracy_meters: p.accuracy_meters,
            captured_at: p.captured_at,
            address: p.address,
            battery_percent: p.battery_percent,
            movement_flag: p.movement_flag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LocationSample {
        LocationSample {
            subject_id: Uuid::new_v4(),
            latitude: 40.0,
            longitude: -73.0,
            accuracy_meters: 10.0,
            speed_mps: Some(1.2),
            captured_at: Utc::now(),
            battery_percent: Some(80),
        }
    }

    #[test]
    fn test_is_moving_above_threshold() {
        let s = sample();
        assert!(s.is_moving(0.5));
    }

    #[test]
    fn test_is_moving_below_threshold() {
        let mut s = sample();
        s.speed_mps = Some(0.2);
        assert!(!s.is_moving(0.5));
    }

    #[test]
    fn test_is_moving_missing_speed() {
        let mut s = sample();
        s.speed_mps = None;
        assert!(!s.is_moving(0.5));
    }

    #[test]
    fn test_ingest_request_valid() {
        let request = IngestSampleRequest {
            subject_id: Uuid::new_v4(),
            latitude: 40.0,
            longitude: -73.0,
            accuracy_meters: 15.0,
            speed_mps: Some(2.0),
            captured_at: Utc::now().timestamp_millis(),
            battery_percent: Some(55),
            address: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_ingest_request_invalid_latitude() {
        let request = IngestSampleRequest {
            subject_id: Uuid::new_v4(),
            latitude: 95.0,
            longitude: -73.0,
            accuracy_meters: 15.0,
            speed_mps: None,
            captured_at: Utc::now().timestamp_millis(),
            battery_percent: None,
            address: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_ingest_request_invalid_battery() {
        let request = IngestSampleRequest {
            subject_id: Uuid::new_v4(),
            latitude: 40.0,
            longitude: -73.0,
            accuracy_meters: 15.0,
            speed_mps: None,
            captured_at: Utc::now().timestamp_millis(),
            battery_percent: Some(150),
            address: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_ingest_request_into_sample() {
        let now = Utc::now();
        let request = IngestSampleRequest {
            subject_id: Uuid::new_v4(),
            latitude: 40.0,
            longitude: -73.0,
            accuracy_meters: 15.0,
            speed_mps: Some(3.0),
            captured_at: now.timestamp_millis(),
            battery_percent: Some(42),
            address: Some("12 Elm St".to_string()),
        };
        let sample = request.into_sample().unwrap();
        assert_eq!(sample.latitude, 40.0);
        assert_eq!(sample.captured_at.timestamp_millis(), now.timestamp_millis());
        assert_eq!(sample.battery_percent, Some(42));
    }

    #[test]
    fn test_ingest_request_deserialization() {
        let json = r#"{
            "subjectId": "550e8400-e29b-41d4-a716-446655440000",
            "latitude": 40.0,
            "longitude": -73.0,
            "accuracyMeters": 12.5,
            "capturedAt": 1701878400000
        }"#;
        let request: IngestSampleRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.accuracy_meters, 12.5);
        assert!(request.speed_mps.is_none());
        assert!(request.address.is_none());
    }

    #[test]
    fn test_latest_position_response_skips_empty_fields() {
        let response = LatestPositionResponse::from(LatestPosition {
            subject_id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            latitude: 40.0,
            longitude: -73.0,
            accuracy_meters: 8.0,
            captured_at: Utc::now(),
            address: None,
            battery_percent: None,
            movement_flag: true,
        });
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("address"));
        assert!(!json.contains("batteryPercent"));
        assert!(json.contains("\"movementFlag\":true"));
    }

    #[test]
    fn test_ingest_disposition_serialization() {
        assert_eq!(
            serde_json::to_string(&IngestDisposition::Accepted).unwrap(),
            "\"accepted\""
        );
        assert_eq!(
            serde_json::to_string(&IngestDisposition::Informational).unwrap(),
            "\"informational\""
        );
    }
}
