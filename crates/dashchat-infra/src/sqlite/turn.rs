//! SQLite conversation turn log.
//!
//! Implements `HistoryStore` from `dashchat-core`. Turns are only ever
//! inserted or deleted per session key, never updated.

use dashchat_core::chat::history::HistoryStore;
use dashchat_types::chat::{SessionKey, Turn, TurnRole};
use dashchat_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `HistoryStore`.
pub struct SqliteTurnRepository {
    pool: DatabasePool,
}

impl SqliteTurnRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Turn.
struct TurnRow {
    id: String,
    user_id: i64,
    session_key: String,
    role: String,
    content: String,
    created_at: String,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            session_key: row.try_get("session_key")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<Turn, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid turn id: {e}")))?;
        let role: TurnRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Turn {
            id,
            user_id: self.user_id,
            session_key: SessionKey::new(self.session_key),
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl HistoryStore for SqliteTurnRepository {
    async fn append(&self, turn: &Turn) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO chat_turns (id, user_id, session_key, role, content, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(turn.id.to_string())
        .bind(turn.user_id)
        .bind(turn.session_key.as_str())
        .bind(turn.role.to_string())
        .bind(&turn.content)
        .bind(format_datetime(&turn.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn recent(
        &self,
        session_key: &SessionKey,
        limit: u32,
    ) -> Result<Vec<Turn>, RepositoryError> {
        // Newest `limit` turns, returned oldest first.
        let rows = sqlx::query(
            r#"SELECT * FROM (
                   SELECT * FROM chat_turns
                   WHERE session_key = ?
                   ORDER BY created_at DESC, id DESC
                   LIMIT ?
               )
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(session_key.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| {
                TurnRow::from_row(row)
                    .map_err(query_error)?
                    .into_turn()
            })
            .collect()
    }

    async fn clear(&self, session_key: &SessionKey) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM chat_turns WHERE session_key = ?")
            .bind(session_key.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::fixtures::test_pool;
    use chrono::{Duration, Utc};

    fn key(raw: &str) -> SessionKey {
        SessionKey::new(raw)
    }

    fn turn_at(session: &str, role: TurnRole, content: &str, offset_ms: i64) -> Turn {
        let mut turn = Turn::new(1, key(session), role, content.to_string());
        turn.created_at = Utc::now() + Duration::milliseconds(offset_ms);
        turn
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let repo = SqliteTurnRepository::new(test_pool().await);
        let turn = Turn::new(42, key("dashboard:42:project:acme"), TurnRole::User, "hello".to_string());
        repo.append(&turn).await.unwrap();

        let turns = repo.recent(&key("dashboard:42:project:acme"), 20).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].id, turn.id);
        assert_eq!(turns[0].user_id, 42);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[0].content, "hello");
    }

    #[tokio::test]
    async fn test_recent_returns_newest_in_chronological_order() {
        let repo = SqliteTurnRepository::new(test_pool().await);
        for i in 0..5 {
            let role = if i % 2 == 0 { TurnRole::User } else { TurnRole::Assistant };
            repo.append(&turn_at("s", role, &format!("t{i}"), i * 10))
                .await
                .unwrap();
        }

        let turns = repo.recent(&key("s"), 3).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["t2", "t3", "t4"]);
    }

    #[tokio::test]
    async fn test_same_timestamp_orders_by_id() {
        let repo = SqliteTurnRepository::new(test_pool().await);
        let now = Utc::now();
        let mut first = Turn::new(1, key("s"), TurnRole::User, "first".to_string());
        let mut second = Turn::new(1, key("s"), TurnRole::Assistant, "second".to_string());
        first.created_at = now;
        second.created_at = now;
        first.id = Uuid::from_u128(1);
        second.id = Uuid::from_u128(2);
        repo.append(&second).await.unwrap();
        repo.append(&first).await.unwrap();

        let turns = repo.recent(&key("s"), 10).await.unwrap();
        assert_eq!(turns[0].content, "first");
        assert_eq!(turns[1].content, "second");
    }

    #[tokio::test]
    async fn test_clear_only_removes_one_session() {
        let repo = SqliteTurnRepository::new(test_pool().await);
        repo.append(&turn_at("dashboard:1:project:a", TurnRole::User, "a", 0))
            .await
            .unwrap();
        repo.append(&turn_at("dashboard:1:project:a", TurnRole::Assistant, "b", 1))
            .await
            .unwrap();
        repo.append(&turn_at("dashboard:1:none", TurnRole::User, "c", 2))
            .await
            .unwrap();

        let deleted = repo.clear(&key("dashboard:1:project:a")).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(repo.recent(&key("dashboard:1:project:a"), 10).await.unwrap().is_empty());
        assert_eq!(repo.recent(&key("dashboard:1:none"), 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_unknown_session_is_zero() {
        let repo = SqliteTurnRepository::new(test_pool().await);
        assert_eq!(repo.clear(&key("nobody")).await.unwrap(), 0);
    }
}
