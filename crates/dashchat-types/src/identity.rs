//! Verified caller identity.

use serde::{Deserialize, Serialize};

/// The identity attached to an authenticated request.
///
/// Token issuance and verification happen elsewhere; by the time one of
/// these exists the caller is known to be who they claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub display_name: Option<String>,
    /// Admins bypass tier resolution entirely.
    pub is_admin: bool,
}

impl Identity {
    /// Name to address the user by: display name, else email.
    pub fn addressed_as(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}
