//! Common validation utilities.

use chrono::{DateTime, TimeZone, Utc};
use validator::ValidationError;

/// Maximum age of a capture timestamp in days.
const MAX_CAPTURED_AT_AGE_DAYS: i64 = 7;

/// Maximum allowed future timestamp tolerance in seconds (clock skew).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 300;

/// Upper sanity bound for a geofence radius in meters.
const MAX_RADIUS_METERS: f64 = 50_000.0;

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lng: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lng) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates that accuracy is non-negative.
pub fn validate_accuracy(accuracy: f64) -> Result<(), ValidationError> {
    if accuracy >= 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("accuracy_range");
        err.message = Some("Accuracy must be non-negative".into());
        Err(err)
    }
}

/// Validates that speed is non-negative.
pub fn validate_speed(speed: f64) -> Result<(), ValidationError> {
    if speed >= 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("speed_range");
        err.message = Some("Speed must be non-negative".into());
        Err(err)
    }
}

/// Validates that battery level is within valid range (0 to 100).
pub fn validate_battery_percent(level: i32) -> Result<(), ValidationError> {
    if (0..=100).contains(&level) {
        Ok(())
    } else {
        let mut err = ValidationError::new("battery_range");
        err.message = Some("Battery percent must be between 0 and 100".into());
        Err(err)
    }
}

/// Validates that a geofence radius is positive and within the sanity cap.
pub fn validate_radius(radius_meters: f64) -> Result<(), ValidationError> {
    if radius_meters > 0.0 && radius_meters <= MAX_RADIUS_METERS {
        Ok(())
    } else {
        let mut err = ValidationError::new("radius_range");
        err.message = Some("Radius must be between 0 and 50000 meters".into());
        Err(err)
    }
}

/// Validates that a capture timestamp (in milliseconds since epoch) is within
/// acceptable range.
/// - Must not be more than 5 minutes in the future (allows for clock skew)
/// - Must not be older than 7 days
///
/// This bounds request admission only; the engine applies its own, tighter
/// staleness rule before evaluating containment.
pub fn validate_captured_at(timestamp_millis: i64) -> Result<(), ValidationError> {
    let now = Utc::now();

    let captured_at: DateTime<Utc> = match Utc.timestamp_millis_opt(timestamp_millis).single() {
        Some(ts) => ts,
        None => {
            let mut err = ValidationError::new("captured_at_invalid");
            err.message = Some("Invalid capture timestamp".into());
            return Err(err);
        }
    };

    let future_limit = now + chrono::Duration::seconds(MAX_FUTURE_TOLERANCE_SECS);
    if captured_at > future_limit {
        let mut err = ValidationError::new("captured_at_future");
        err.message = Some("Capture timestamp cannot be in the future".into());
        return Err(err);
    }

    let past_limit = now - chrono::Duration::days(MAX_CAPTURED_AT_AGE_DAYS);
    if captured_at < past_limit {
        let mut err = ValidationError::new("captured_at_old");
        err.message = Some("Capture timestamp cannot be older than 7 days".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Latitude tests
    #[test]
    fn test_validate_latitude() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.1).is_err());
        assert!(validate_latitude(-90.1).is_err());
    }

    #[test]
    fn test_validate_latitude_error_message() {
        let err = validate_latitude(100.0).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Latitude must be between -90 and 90"
        );
    }

    // Longitude tests
    #[test]
    fn test_validate_longitude() {
        assert!(validate_longitude(0.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.1).is_err());
        assert!(validate_longitude(-180.1).is_err());
    }

    #[test]
    fn test_validate_longitude_error_message() {
        let err = validate_longitude(200.0).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Longitude must be between -180 and 180"
        );
    }

    // Accuracy tests
    #[test]
    fn test_validate_accuracy() {
        assert!(validate_accuracy(0.0).is_ok());
        assert!(validate_accuracy(100.0).is_ok());
        assert!(validate_accuracy(-1.0).is_err());
    }

    // Speed tests
    #[test]
    fn test_validate_speed() {
        assert!(validate_speed(0.0).is_ok());
        assert!(validate_speed(27.8).is_ok());
        assert!(validate_speed(-1.0).is_err());
    }

    // Battery tests
    #[test]
    fn test_validate_battery_percent() {
        assert!(validate_battery_percent(0).is_ok());
        assert!(validate_battery_percent(100).is_ok());
        assert!(validate_battery_percent(-1).is_err());
        assert!(validate_battery_percent(101).is_err());
    }

    // Radius tests
    #[test]
    fn test_validate_radius() {
        assert!(validate_radius(100.0).is_ok());
        assert!(validate_radius(50_000.0).is_ok());
        assert!(validate_radius(0.0).is_err());
        assert!(validate_radius(-10.0).is_err());
        assert!(validate_radius(50_001.0).is_err());
    }

    #[test]
    fn test_validate_radius_error_message() {
        let err = validate_radius(0.0).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Radius must be between 0 and 50000 meters"
        );
    }

    // Capture timestamp tests
    #[test]
    fn test_validate_captured_at_current() {
        assert!(validate_captured_at(Utc::now().timestamp_millis()).is_ok());
    }

    #[test]
    fn test_validate_captured_at_recent_past() {
        let one_hour_ago = Utc::now() - chrono::Duration::hours(1);
        assert!(validate_captured_at(one_hour_ago.timestamp_millis()).is_ok());

        let six_days_ago = Utc::now() - chrono::Duration::days(6);
        assert!(validate_captured_at(six_days_ago.timestamp_millis()).is_ok());
    }

    #[test]
    fn test_validate_captured_at_too_old() {
        let eight_days_ago = Utc::now() - chrono::Duration::days(8);
        assert!(validate_captured_at(eight_days_ago.timestamp_millis()).is_err());
    }

    #[test]
    fn test_validate_captured_at_slight_future() {
        let four_min_future = Utc::now() + chrono::Duration::minutes(4);
        assert!(validate_captured_at(four_min_future.timestamp_millis()).is_ok());
    }

    #[test]
    fn test_validate_captured_at_too_far_future() {
        let ten_min_future = Utc::now() + chrono::Duration::minutes(10);
        assert!(validate_captured_at(ten_min_future.timestamp_millis()).is_err());
    }

    #[test]
    fn test_validate_captured_at_future_error_message() {
        let far_future = Utc::now() + chrono::Duration::hours(1);
        let err = validate_captured_at(far_future.timestamp_millis()).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Capture timestamp cannot be in the future"
        );
    }
}
