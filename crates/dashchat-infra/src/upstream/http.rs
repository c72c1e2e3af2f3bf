//! Streaming HTTP client for an OpenAI-compatible completion endpoint.
//!
//! The reqwest client is built once in the composition root and injected,
//! so the transport (timeouts, proxies, TLS) is configured in one place and
//! tests can point the adapter at a local server.

use std::time::Duration;

use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use dashchat_core::relay::upstream::{CompletionUpstream, UpstreamBody};
use dashchat_types::config::UpstreamConfig;
use dashchat_types::error::UpstreamError;
use dashchat_types::upstream::CompletionRequest;

/// Path appended to the configured base URL.
pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Bytes of a rejected response body kept for logging.
pub const MAX_ERROR_BODY: usize = 2048;

/// Build the shared HTTP client for one upstream target.
pub fn build_client(config: &UpstreamConfig) -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| UpstreamError::Transport(format!("failed to build HTTP client: {e}")))
}

fn map_reqwest_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Transport(e.to_string())
    }
}

/// `CompletionUpstream` over HTTP.
///
/// Does NOT derive Debug so the credential cannot leak through formatting.
pub struct HttpCompletionUpstream {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpCompletionUpstream {
    pub fn new(client: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}{COMPLETIONS_PATH}", config.base_url.trim_end_matches('/')),
            api_key: config
                .api_key
                .as_deref()
                .filter(|key| !key.is_empty())
                .map(|key| SecretString::from(key.to_string())),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CompletionUpstream for HttpCompletionUpstream {
    async fn open_stream(&self, request: CompletionRequest) -> Result<UpstreamBody, UpstreamError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Accept", "text/event-stream")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            messages = request.messages.len(),
            "Opening upstream stream"
        );
        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            warn!(status = %status, "Upstream returned error status");
            return Err(UpstreamError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(map_reqwest_error)),
        ))
    }
}

/// The start of an error response body, at most `MAX_ERROR_BODY` bytes.
async fn read_error_body(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(chunk) => {
                let room = MAX_ERROR_BODY - body.len();
                body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                if body.len() == MAX_ERROR_BODY {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "Failed to read upstream error body");
                break;
            }
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
