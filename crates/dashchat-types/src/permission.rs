//! Chat capability tiers and per-user grants.
//!
//! Tiers form a total order: `none < guide < bug < developer`. A user holds
//! one global tier for the chat capability, and may additionally carry a
//! per-project override that either inherits the global tier or pins an
//! explicit one.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Ordered chat capability level.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (chat_tier IN ('none', 'guide', 'bug', 'developer'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    None,
    Guide,
    Bug,
    Developer,
}

impl Tier {
    /// Highest tier, granted to admin identities unconditionally.
    pub const TOP: Tier = Tier::Developer;

    /// Whether this tier may enter the chat relay at all.
    pub fn can_chat(self) -> bool {
        self > Tier::None
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::None => write!(f, "none"),
            Tier::Guide => write!(f, "guide"),
            Tier::Bug => write!(f, "bug"),
            Tier::Developer => write!(f, "developer"),
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Tier::None),
            "guide" => Ok(Tier::Guide),
            "bug" => Ok(Tier::Bug),
            "developer" => Ok(Tier::Developer),
            other => Err(format!("invalid chat tier: '{other}'")),
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::None
    }
}

/// Per-project override of a user's chat tier.
///
/// "No override" is its own variant rather than a null tier, so a missing
/// row can only ever mean "fall back to the global tier".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "tier")]
pub enum ProjectOverride {
    #[default]
    Inherit,
    Explicit(Tier),
}

impl ProjectOverride {
    /// Apply this override on top of a global tier.
    pub fn apply(self, global: Tier) -> Tier {
        match self {
            ProjectOverride::Inherit => global,
            ProjectOverride::Explicit(tier) => tier,
        }
    }
}

/// A user's chat grant as seen for one (user, project) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub global: Tier,
    pub project_override: ProjectOverride,
}

impl PermissionGrant {
    /// A grant with no project override.
    pub fn global_only(global: Tier) -> Self {
        Self {
            global,
            project_override: ProjectOverride::Inherit,
        }
    }
}
