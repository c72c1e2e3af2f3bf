//! Project records as seen by the chat relay (read-only).

use serde::{Deserialize, Serialize};

/// A dashboard project a conversation can be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub slug: String,
    /// Human-readable project name.
    pub name: String,
    /// `owner/name` of the backing repository.
    pub repo_full_name: String,
    pub created_by_user_id: i64,
    /// Free-form description the assistant is primed with.
    pub brief: Option<String>,
}
