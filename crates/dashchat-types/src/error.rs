use thiserror::Error;

/// Errors from repository operations (used by trait definitions in dashchat-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the upstream completion service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Non-success status before any frame was read.
    #[error("upstream rejected request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Connect, read, or write failure.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// The exchange outlived its time ceiling.
    #[error("upstream exchange timed out")]
    Timeout,
}

/// Errors that end a chat request before any stream frame is sent.
///
/// Everything after the switch to the event-stream media type is reported
/// in-band instead; see the relay.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("authentication required")]
    AuthenticationMissing,

    #[error("No chat access")]
    PermissionDenied,

    #[error("Chat requires a project context")]
    MissingProjectContext,

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("message must not be empty")]
    EmptyMessage,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_permission_denied_message_is_client_facing() {
        assert_eq!(ChatError::PermissionDenied.to_string(), "No chat access");
    }

    #[test]
    fn test_upstream_rejected_display() {
        let err = UpstreamError::Rejected {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "upstream rejected request with HTTP 502: bad gateway"
        );
    }

    #[test]
    fn test_chat_error_wraps_repository_error() {
        let err: ChatError = RepositoryError::Connection.into();
        assert_eq!(err.to_string(), "database connection error");
    }
}
