//! Bearer token to identity lookup.
//!
//! Tokens are SHA-256 hashed and compared against `api_tokens.token_hash`;
//! the plaintext is never stored.

use chrono::Utc;
use dashchat_types::error::RepositoryError;
use dashchat_types::identity::Identity;
use sha2::{Digest, Sha256};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, query_error};

/// Prefix of issued tokens, to make them recognizable in config files.
pub const TOKEN_PREFIX: &str = "dash_";

/// Compute SHA-256 hash of a bearer token (lowercase hex).
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{:x}", digest)
}

/// Resolves bearer tokens to dashboard identities.
#[derive(Clone)]
pub struct SqliteIdentityRepository {
    pool: DatabasePool,
}

/// Internal row type for mapping SQLite rows to domain Identity.
struct IdentityRow {
    id: i64,
    email: String,
    display_name: Option<String>,
    is_admin: bool,
}

impl IdentityRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
            is_admin: row.try_get("is_admin")?,
        })
    }

    fn into_identity(self) -> Identity {
        Identity {
            user_id: self.id,
            email: self.email,
            display_name: self.display_name,
            is_admin: self.is_admin,
        }
    }
}

impl SqliteIdentityRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// The identity a bearer token belongs to, if any.
    ///
    /// Bumps the token's `last_used_at`; a failed bump does not fail the
    /// lookup.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Identity>, RepositoryError> {
        let token_hash = hash_token(token);
        let row = sqlx::query(
            r#"SELECT t.id AS token_id, u.id, u.email, u.display_name, u.is_admin
               FROM api_tokens t
               JOIN users u ON u.id = t.user_id
               WHERE t.token_hash = ?"#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let token_id: String = row.try_get("token_id").map_err(query_error)?;
        let identity = IdentityRow::from_row(&row).map_err(query_error)?.into_identity();

        if let Err(e) = sqlx::query("UPDATE api_tokens SET last_used_at = ? WHERE id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(&token_id)
            .execute(&self.pool.writer)
            .await
        {
            debug!(error = %e, "Failed to record token use");
        }

        Ok(Some(identity))
    }

    pub async fn find_user(&self, user_id: i64) -> Result<Option<Identity>, RepositoryError> {
        let row = sqlx::query("SELECT id, email, display_name, is_admin FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.as_ref()
            .map(|row| IdentityRow::from_row(row).map(IdentityRow::into_identity))
            .transpose()
            .map_err(query_error)
    }

    /// Create a token for an existing user. Returns the plaintext once.
    pub async fn issue_token(&self, user_id: i64) -> Result<String, RepositoryError> {
        if self.find_user(user_id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let token = format!(
            "{TOKEN_PREFIX}{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        sqlx::query(
            "INSERT INTO api_tokens (id, user_id, token_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::fixtures::{insert_user, test_pool};

    #[test]
    fn test_hash_token_known_value() {
        // SHA-256 of empty string
        assert_eq!(
            hash_token(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_issued_token_resolves_to_user() {
        let pool = test_pool().await;
        insert_user(&pool, 3, "ada@example.com", "guide", true).await;
        let repo = SqliteIdentityRepository::new(pool.clone());

        let token = repo.issue_token(3).await.unwrap();
        assert!(token.starts_with(TOKEN_PREFIX));

        let identity = repo.find_by_token(&token).await.unwrap().unwrap();
        assert_eq!(identity.user_id, 3);
        assert_eq!(identity.email, "ada@example.com");
        assert!(identity.is_admin);

        let (stored,): (String,) = sqlx::query_as("SELECT token_hash FROM api_tokens")
            .fetch_one(&pool.reader)
            .await
            .unwrap();
        assert_eq!(stored, hash_token(&token));
        assert_ne!(stored, token);
    }

    #[tokio::test]
    async fn test_unknown_token_is_none() {
        let repo = SqliteIdentityRepository::new(test_pool().await);
        assert!(repo.find_by_token("dash_nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_issue_token_for_missing_user() {
        let repo = SqliteIdentityRepository::new(test_pool().await);
        assert!(matches!(
            repo.issue_token(77).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
