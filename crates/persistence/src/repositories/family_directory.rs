//! Family membership directory backed by PostgreSQL.
//!
//! Reads the membership table maintained by the external family management
//! system.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::family::FamilyMember;
use engine::directory::FamilyDirectory;
use engine::error::StoreError;

use crate::entities::FamilyMemberRow;
use crate::metrics::QueryTimer;

/// PostgreSQL-backed membership lookup.
pub struct PostgresFamilyDirectory {
    pool: PgPool,
}

impl PostgresFamilyDirectory {
    /// Create a new directory instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait::async_trait]
impl FamilyDirectory for PostgresFamilyDirectory {
    async fn family_of_subject(&self, subject_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let timer = QueryTimer::new("family_of_subject");
        let row: Result<Option<(Uuid,)>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT family_id
            FROM family_members
            WHERE user_id = $1
            LIMIT 1
            "#,
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(row.map_err(unavailable)?.map(|(family_id,)| family_id))
    }

    async fn member(
        &self,
        family_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<FamilyMember>, StoreError> {
        let timer = QueryTimer::new("family_member");
        let row = sqlx::query_as::<_, FamilyMemberRow>(
            r#"
            SELECT family_id, user_id, display_name, role, joined_at
            FROM family_members
            WHERE family_id = $1 AND user_id = $2
            "#,
        )
        .bind(family_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        row.map_err(unavailable)?.map(FamilyMember::try_from).transpose()
    }
}
