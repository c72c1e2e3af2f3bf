//! Conversation turn and session key types for dashchat.
//!
//! A conversation is an append-only log of turns partitioned by session
//! key. Turns are never updated or reordered; they are only ever created
//! one at a time or deleted en masse for one session key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Who authored a persisted turn.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('user', 'assistant'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// Stable identifier of one conversation.
///
/// Partitions persisted turns and doubles as the `user` tag sent upstream.
/// Construct through `SessionKeyBuilder` in dashchat-core; `new` exists for
/// rehydrating keys read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One immutable message in a conversation.
///
/// Ordered by `(created_at, id)`; ids are UUID v7 so the tiebreak follows
/// creation order as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: Uuid,
    pub user_id: i64,
    pub session_key: SessionKey,
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a fresh turn stamped with the current time.
    pub fn new(user_id: i64, session_key: SessionKey, role: TurnRole, content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            session_key,
            role,
            content,
            created_at: Utc::now(),
        }
    }
}
