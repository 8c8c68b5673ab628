//! Family domain model.
//!
//! Families are the sharing and authorization boundary: subjects belong to
//! exactly one family, and geofences are owned by a family. Account
//! provisioning and invitations live outside this system; these types model
//! only what the engine needs to authorize commands and attribute events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A family grouping subjects and the geofences they share.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Role of a member within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Parent,
    Child,
}

impl MemberRole {
    /// Converts to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Parent => "parent",
            MemberRole::Child => "child",
        }
    }

    /// Parses from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "parent" => Some(MemberRole::Parent),
            "child" => Some(MemberRole::Child),
            _ => None,
        }
    }

    /// Whether this role may create, update, or deactivate geofences.
    pub fn can_manage_geofences(&self) -> bool {
        matches!(self, MemberRole::Parent)
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Membership of a user in a family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub family_id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}
