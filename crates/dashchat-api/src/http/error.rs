//! Application error type mapping to HTTP status codes and `{"error": ...}`
//! bodies.
//!
//! Only errors raised before the response switches to `text/event-stream`
//! pass through here; later failures are in-band relay frames.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use dashchat_types::error::ChatError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Chat checks and storage failures.
    Chat(ChatError),
    /// Malformed request body or query string.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Chat(ChatError::AuthenticationMissing) => StatusCode::UNAUTHORIZED,
            AppError::Chat(ChatError::PermissionDenied) => StatusCode::FORBIDDEN,
            AppError::Chat(
                ChatError::MissingProjectContext
                | ChatError::InvalidImage(_)
                | ChatError::EmptyMessage,
            ) => StatusCode::BAD_REQUEST,
            AppError::Chat(ChatError::Repository(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Storage details stay in the logs.
    fn message(&self) -> String {
        match self {
            AppError::Chat(ChatError::Repository(_)) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
            AppError::Chat(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Chat(ChatError::Repository(e)) => {
                tracing::error!(error = %e, "Repository failure while handling chat request");
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error while handling chat request");
            }
            _ => {}
        }

        let body = json!({ "error": self.message() });
        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashchat_types::error::RepositoryError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(ChatError::AuthenticationMissing).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(ChatError::PermissionDenied).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(ChatError::MissingProjectContext).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(ChatError::InvalidImage("x".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(ChatError::Repository(RepositoryError::NotFound)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_details_are_not_exposed() {
        let err = AppError::from(ChatError::Repository(RepositoryError::Query(
            "no such table: chat_turns".to_string(),
        )));
        assert_eq!(err.message(), "Internal server error");
        assert_eq!(
            AppError::from(ChatError::PermissionDenied).message(),
            "No chat access"
        );
    }
}
