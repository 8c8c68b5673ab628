//! Geofence event entity (database row mapping).
//!
//! Maps to the `geofence_events` table. The transition column is stored as
//! text; decoding an unknown value is a typed error and a metric increment,
//! never a silent default.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::geofence_event::{EventLocation, GeofenceEvent, GeofenceTransition};
use engine::error::StoreError;

/// Database row mapping for the geofence_events table.
#[derive(Debug, Clone, FromRow)]
pub struct GeofenceEventRow {
    pub id: Uuid,
    pub family_id: Uuid,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub geofence_id: Uuid,
    pub geofence_name: String,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<GeofenceEventRow> for GeofenceEvent {
    type Error = StoreError;

    fn try_from(row: GeofenceEventRow) -> Result<Self, Self::Error> {
        let transition = GeofenceTransition::parse(&row.event_type).ok_or_else(|| {
            engine::metrics::record_decode_failure("event_type");
            StoreError::Decode {
                field: "event_type",
                value: row.event_type.clone(),
            }
        })?;
        Ok(Self {
            id: row.id,
            family_id: row.family_id,
            subject_id: row.subject_id,
            subject_name: row.subject_name,
            geofence_id: row.geofence_id,
            geofence_name: row.geofence_name,
            transition,
            occurred_at: row.occurred_at,
            location: EventLocation {
                latitude: row.latitude,
                longitude: row.longitude,
                accuracy_meters: row.accuracy_meters,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(event_type: &str) -> GeofenceEventRow {
        GeofenceEventRow {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            subject_name: "Sam".to_string(),
            geofence_id: Uuid::new_v4(),
            geofence_name: "Home".to_string(),
            event_type: event_type.to_string(),
            occurred_at: Utc::now(),
            latitude: 40.0,
            longitude: -73.0,
            accuracy_meters: 10.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_converts_to_domain() {
        let event: GeofenceEvent = row("enter").try_into().unwrap();
        assert_eq!(event.transition, GeofenceTransition::Enter);
        assert_eq!(event.subject_name, "Sam");
        assert_eq!(event.location.latitude, 40.0);
    }

    #[test]
    fn test_unknown_event_type_is_typed_error() {
        let result: Result<GeofenceEvent, StoreError> = row("dwell").try_into();
        match result {
            Err(StoreError::Decode { field, value }) => {
                assert_eq!(field, "event_type");
                assert_eq!(value, "dwell");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
