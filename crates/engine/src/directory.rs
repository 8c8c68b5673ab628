//! Family membership lookup.
//!
//! Account provisioning and family management are external collaborators;
//! the engine consumes membership through this trait only.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use domain::models::family::FamilyMember;

use crate::error::StoreError;

/// Read access to family membership.
#[async_trait::async_trait]
pub trait FamilyDirectory: Send + Sync {
    /// The family a subject currently belongs to, if any.
    async fn family_of_subject(&self, subject_id: Uuid) -> Result<Option<Uuid>, StoreError>;

    /// Membership record of a user in a family, if any.
    async fn member(
        &self,
        family_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<FamilyMember>, StoreError>;
}

/// In-memory directory for tests and single-node deployments.
#[derive(Default)]
pub struct InMemoryFamilyDirectory {
    members: RwLock<HashMap<Uuid, Vec<FamilyMember>>>,
}

impl InMemoryFamilyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a member. Replaces an existing membership of the same user
    /// in the same family.
    pub async fn add_member(&self, member: FamilyMember) {
        let mut members = self.members.write().await;
        let family = members.entry(member.family_id).or_default();
        family.retain(|m| m.user_id != member.user_id);
        family.push(member);
    }

    /// Removes a member from a family.
    pub async fn remove_member(&self, family_id: Uuid, user_id: Uuid) {
        let mut members = self.members.write().await;
        if let Some(family) = members.get_mut(&family_id) {
            family.retain(|m| m.user_id != user_id);
        }
    }
}

#[async_trait::async_trait]
impl FamilyDirectory for InMemoryFamilyDirectory {
    async fn family_of_subject(&self, subject_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let members = self.members.read().await;
        Ok(members
            .values()
            .flatten()
            .find(|m| m.user_id == subject_id)
            .map(|m| m.family_id))
    }

    async fn member(
        &self,
        family_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<FamilyMember>, StoreError> {
        let members = self.members.read().await;
        Ok(members
            .get(&family_id)
            .and_then(|family| family.iter().find(|m| m.user_id == user_id))
            .cloned())
    }
}
