//! Family membership entity (database row mapping).
//!
//! Maps to the `family_members` table, maintained by the external family
//! management system and read here for authorization and name
//! denormalization.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::family::{FamilyMember, MemberRole};
use engine::error::StoreError;

/// Database row mapping for the family_members table.
#[derive(Debug, Clone, FromRow)]
pub struct FamilyMemberRow {
    pub family_id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

impl TryFrom<FamilyMemberRow> for FamilyMember {
    type Error = StoreError;

    fn try_from(row: FamilyMemberRow) -> Result<Self, Self::Error> {
        let role = MemberRole::parse(&row.role).ok_or_else(|| {
            engine::metrics::record_decode_failure("role");
            StoreError::Decode {
                field: "role",
                value: row.role.clone(),
            }
        })?;
        Ok(Self {
            family_id: row.family_id,
            user_id: row.user_id,
            display_name: row.display_name,
            role,
            joined_at: row.joined_at,
        })
    }
}
