//! HistoryStore trait definition.
//!
//! The turn log is append-only: turns are inserted one at a time, read back
//! newest-N in chronological order, and deleted only en masse for a single
//! session key. No operation reads and rewrites existing turns, so writers
//! need no coordination.

use dashchat_types::chat::{SessionKey, Turn};
use dashchat_types::error::RepositoryError;

/// Repository trait for conversation turn persistence.
///
/// Implementations live in dashchat-infra (e.g., `SqliteTurnRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait HistoryStore: Send + Sync {
    /// Append one turn to its session's log.
    fn append(
        &self,
        turn: &Turn,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The last `limit` turns of a session, oldest first.
    fn recent(
        &self,
        session_key: &SessionKey,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Delete every turn of exactly one session. Returns the number removed.
    fn clear(
        &self,
        session_key: &SessionKey,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
