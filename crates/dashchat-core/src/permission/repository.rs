//! Read-side ports for grants and projects.
//!
//! Both are point lookups against records this service does not own.

use dashchat_types::error::RepositoryError;
use dashchat_types::permission::{ProjectOverride, Tier};
use dashchat_types::project::Project;

/// Lookup of a user's chat tier grants.
pub trait GrantRepository: Send + Sync {
    /// The user's global chat tier. Unknown users resolve to `Tier::None`.
    fn global_tier(
        &self,
        user_id: i64,
    ) -> impl std::future::Future<Output = Result<Tier, RepositoryError>> + Send;

    /// The user's override for one project; `Inherit` when none is stored.
    fn project_override(
        &self,
        user_id: i64,
        project_id: i64,
    ) -> impl std::future::Future<Output = Result<ProjectOverride, RepositoryError>> + Send;
}

/// Lookup of project records.
pub trait ProjectRepository: Send + Sync {
    fn find_project(
        &self,
        project_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Project>, RepositoryError>> + Send;

    /// Record that a chat exchange just completed on this project.
    fn touch_chat_activity(
        &self,
        project_id: i64,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
