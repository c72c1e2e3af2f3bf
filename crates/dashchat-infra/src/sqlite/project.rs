//! SQLite project lookups.

use chrono::Utc;
use dashchat_core::permission::repository::ProjectRepository;
use dashchat_types::error::RepositoryError;
use dashchat_types::project::Project;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, query_error};

/// SQLite-backed implementation of `ProjectRepository`.
pub struct SqliteProjectRepository {
    pool: DatabasePool,
}

impl SqliteProjectRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Look a project up by slug (CLI helpers address projects by slug).
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Project>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM projects WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.as_ref()
            .map(|row| ProjectRow::from_row(row).map(ProjectRow::into_project))
            .transpose()
            .map_err(query_error)
    }
}

/// Internal row type for mapping SQLite rows to domain Project.
struct ProjectRow {
    id: i64,
    slug: String,
    name: String,
    repo_full_name: String,
    created_by_user_id: i64,
    brief: Option<String>,
}

impl ProjectRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
            repo_full_name: row.try_get("repo_full_name")?,
            created_by_user_id: row.try_get("created_by_user_id")?,
            brief: row.try_get("brief")?,
        })
    }

    fn into_project(self) -> Project {
        Project {
            id: self.id,
            slug: self.slug,
            name: self.name,
            repo_full_name: self.repo_full_name,
            created_by_user_id: self.created_by_user_id,
            brief: self.brief,
        }
    }
}

impl ProjectRepository for SqliteProjectRepository {
    async fn find_project(&self, project_id: i64) -> Result<Option<Project>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.as_ref()
            .map(|row| ProjectRow::from_row(row).map(ProjectRow::into_project))
            .transpose()
            .map_err(query_error)
    }

    async fn touch_chat_activity(&self, project_id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE projects SET last_chat_at = ? WHERE id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(project_id)
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
