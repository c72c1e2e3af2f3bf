//! Bearer token authentication extractor.
//!
//! Extracts the token from `Authorization: Bearer <token>`, hashes it, and
//! resolves it to the dashboard identity it was issued for.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use dashchat_types::error::ChatError;
use dashchat_types::identity::Identity;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated caller. Extracting this validates the bearer token.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Identity);

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(parts).ok_or(ChatError::AuthenticationMissing)?;

        match state.identities.find_by_token(token).await {
            Ok(Some(identity)) => Ok(CallerIdentity(identity)),
            Ok(None) => {
                tracing::debug!("Rejected unknown bearer token");
                Err(ChatError::AuthenticationMissing.into())
            }
            Err(e) => Err(ChatError::Repository(e).into()),
        }
    }
}

/// The token from `Authorization: Bearer <token>`, if well-formed.
fn extract_bearer(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/chat/send");
        if let Some(value) = auth {
            builder = builder.header("authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(&parts(Some("Bearer dash_abc"))), Some("dash_abc"));
        assert_eq!(extract_bearer(&parts(Some("Bearer   "))), None);
        assert_eq!(extract_bearer(&parts(Some("Basic Zm9vOmJhcg=="))), None);
        assert_eq!(extract_bearer(&parts(None)), None);
    }
}
