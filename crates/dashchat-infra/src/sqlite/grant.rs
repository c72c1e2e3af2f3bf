//! SQLite chat tier grants.
//!
//! Reads `users.chat_tier` and `project_chat_overrides`. A missing user row
//! means no access; a missing override row means "inherit".

use dashchat_core::permission::repository::GrantRepository;
use dashchat_types::error::RepositoryError;
use dashchat_types::permission::{ProjectOverride, Tier};
use sqlx::Row;

use super::pool::DatabasePool;
use super::query_error;

/// SQLite-backed implementation of `GrantRepository`.
pub struct SqliteGrantRepository {
    pool: DatabasePool,
}

impl SqliteGrantRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn parse_tier(raw: &str) -> Result<Tier, RepositoryError> {
    raw.parse().map_err(|e: String| RepositoryError::Query(e))
}

impl GrantRepository for SqliteGrantRepository {
    async fn global_tier(&self, user_id: i64) -> Result<Tier, RepositoryError> {
        let row = sqlx::query("SELECT chat_tier FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("chat_tier").map_err(query_error)?;
                parse_tier(&raw)
            }
            None => Ok(Tier::None),
        }
    }

    async fn project_override(
        &self,
        user_id: i64,
        project_id: i64,
    ) -> Result<ProjectOverride, RepositoryError> {
        let row = sqlx::query(
            "SELECT tier FROM project_chat_overrides WHERE user_id = ? AND project_id = ?",
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("tier").map_err(query_error)?;
                Ok(ProjectOverride::Explicit(parse_tier(&raw)?))
            }
            None => Ok(ProjectOverride::Inherit),
        }
    }
}
