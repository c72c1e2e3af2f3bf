//! Effective tier resolution.
//!
//! effective = admin ? developer : (override is Explicit(t) ? t : global)
//!
//! Resolution is a pure read. A project id that does not resolve to a
//! record is treated as "no project", never as an error.

use std::sync::Arc;

use dashchat_types::error::RepositoryError;
use dashchat_types::permission::{PermissionGrant, ProjectOverride, Tier};
use dashchat_types::project::Project;
use tracing::debug;

use super::repository::{GrantRepository, ProjectRepository};

/// Outcome of resolving a caller against an optional project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tier: Tier,
    /// The bound project, if the requested id resolved to one.
    pub project: Option<Project>,
}

/// Apply the tier rule to an already loaded grant.
pub fn effective_tier(is_admin: bool, grant: PermissionGrant) -> Tier {
    if is_admin {
        return Tier::TOP;
    }
    grant.project_override.apply(grant.global)
}

/// Computes the effective chat tier for a caller.
pub struct PermissionResolver<G: GrantRepository, P: ProjectRepository> {
    grants: Arc<G>,
    projects: Arc<P>,
}

impl<G: GrantRepository, P: ProjectRepository> PermissionResolver<G, P> {
    pub fn new(grants: Arc<G>, projects: Arc<P>) -> Self {
        Self { grants, projects }
    }

    pub async fn resolve(
        &self,
        user_id: i64,
        project_id: Option<i64>,
        is_admin: bool,
    ) -> Result<Resolution, RepositoryError> {
        let project = match project_id {
            Some(id) => self.projects.find_project(id).await?,
            None => None,
        };

        let tier = if is_admin {
            Tier::TOP
        } else {
            let global = self.grants.global_tier(user_id).await?;
            let project_override = match &project {
                Some(project) => self.grants.project_override(user_id, project.id).await?,
                None => ProjectOverride::Inherit,
            };
            effective_tier(
                false,
                PermissionGrant {
                    global,
                    project_override,
                },
            )
        };

        debug!(
            user_id,
            project_id = project.as_ref().map(|p| p.id),
            is_admin,
            tier = %tier,
            "Resolved chat tier"
        );

        Ok(Resolution { tier, project })
    }
}
