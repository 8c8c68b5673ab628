//! Geofence transition event domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Boundary crossing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeofenceTransition {
    Enter,
    Exit,
}

impl GeofenceTransition {
    /// Converts to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Exit => "exit",
        }
    }

    /// Parses from string representation (case-insensitive).
    ///
    /// Returns `None` for anything else; callers decoding persisted records
    /// must surface that as a typed error, never substitute a default.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "enter" => Some(Self::Enter),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

impl std::fmt::Display for GeofenceTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The position that triggered a transition event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
}

/// An enter/exit event for a (subject, geofence) pair.
///
/// Append-only and immutable once written. `id` is generated exactly once
/// when the transition is committed and reused across persistence retries,
/// making the append idempotent.
///
/// Subject and geofence names are denormalized at write time so later
/// renames or deactivations do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceEvent {
    pub id: Uuid,
    pub family_id: Uuid,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub geofence_id: Uuid,
    pub geofence_name: String,
    pub transition: GeofenceTransition,
    pub occurred_at: DateTime<Utc>,
    pub location: EventLocation,
}

/// Query parameters for listing geofence events.
///
/// GET /api/v1/geofence-events?familyId=<uuid>
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsQuery {
    pub family_id: Uuid,
    pub limit: Option<i64>,
}

/// Response for a single geofence event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceEventResponse {
    pub id: Uuid,
    pub family_id: Uuid,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub geofence_id: Uuid,
    pub geofence_name: String,
    pub transition: GeofenceTransition,
    pub occurred_at: DateTime<Utc>,
    pub location: EventLocation,
}

impl From<GeofenceEvent> for GeofenceEventResponse {
    fn from(event: GeofenceEvent) -> Self {
        Self {
            id: event.id,
            family_id: event.family_id,
            subject_id: event.subject_id,
            subject_name: event.subject_name,
            geofence_id: event.geofence_id,
            geofence_name: event.geofence_name,
            transition: event.transition,
            occurred_at: event.occurred_at,
            location: event.location,
        }
    }
}

/// Response for listing geofence events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsResponse {
    pub events: Vec<GeofenceEventResponse>,
    pub total: usize,
}

/// Derived presence of a subject, read from the event log.
///
/// A subject is inside a geofence iff the chronologically last event for the
/// subject is an `enter` for that geofence with no later `exit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SubjectStatus {
    Inside {
        geofence_id: Uuid,
        geofence_name: String,
        since: DateTime<Utc>,
    },
    Outside,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(transition: GeofenceTransition) -> GeofenceEvent {
        GeofenceEvent {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            subject_name: "Sam".to_string(),
            geofence_id: Uuid::new_v4(),
            geofence_name: "Home".to_string(),
            transition,
            occurred_at: Utc::now(),
            location: EventLocation {
                latitude: 40.0,
                longitude: -73.0,
                accuracy_meters: 10.0,
            },
        }
    }

    #[test]
    fn test_transition_as_str() {
        assert_eq!(GeofenceTransition::Enter.as_str(), "enter");
        assert_eq!(GeofenceTransition::Exit.as_str(), "exit");
    }

    #[test]
    fn test_transition_parse() {
        assert_eq!(
            GeofenceTransition::parse("enter"),
            Some(GeofenceTransition::Enter)
        );
        assert_eq!(
            GeofenceTransition::parse("EXIT"),
            Some(GeofenceTransition::Exit)
        );
        assert_eq!(GeofenceTransition::parse("dwell"), None);
        assert_eq!(GeofenceTransition::parse(""), None);
    }

    #[test]
    fn test_transition_serialization() {
        assert_eq!(
            serde_json::to_string(&GeofenceTransition::Enter).unwrap(),
            "\"enter\""
        );
        let parsed: GeofenceTransition = serde_json::from_str("\"exit\"").unwrap();
        assert_eq!(parsed, GeofenceTransition::Exit);
    }

    #[test]
    fn test_event_response_serialization() {
        let response: GeofenceEventResponse = event(GeofenceTransition::Enter).into();
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"transition\":\"enter\""));
        assert!(json.contains("\"subjectName\":\"Sam\""));
        assert!(json.contains("\"geofenceName\":\"Home\""));
        assert!(json.contains("\"accuracyMeters\":10"));
    }

    #[test]
    fn test_subject_status_inside_serialization() {
        let status = SubjectStatus::Inside {
            geofence_id: Uuid::nil(),
            geofence_name: "Home".to_string(),
            since: Utc::now(),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"status\":\"inside\""));
        assert!(json.contains("\"geofenceName\":\"Home\""));
        assert!(json.contains("\"since\""));
    }

    #[test]
    fn test_subject_status_outside_serialization() {
        let json = serde_json::to_string(&SubjectStatus::Outside).unwrap();
        assert_eq!(json, r#"{"status":"outside"}"#);
    }

    #[test]
    fn test_list_query_limit_optional() {
        let json = r#"{"familyId": "550e8400-e29b-41d4-a716-446655440000"}"#;
        let query: ListEventsQuery = serde_json::from_str(json).unwrap();
        assert!(query.limit.is_none());
    }
}
