//! CompletionUpstream trait definition.
//!
//! The relay only needs two things from the upstream: open a streaming
//! request, and read its body as raw bytes. Status handling happens in the
//! implementation so the relay sees either a body or a typed rejection.

use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use dashchat_types::error::UpstreamError;
use dashchat_types::upstream::CompletionRequest;

/// Raw upstream response body.
pub type UpstreamBody = Pin<Box<dyn Stream<Item = Result<Bytes, UpstreamError>> + Send + 'static>>;

/// Trait for the streaming completion endpoint.
///
/// Implementations live in dashchat-infra (e.g., `HttpCompletionUpstream`).
pub trait CompletionUpstream: Send + Sync {
    /// Issue the streaming request.
    ///
    /// Resolves once response headers arrive. A non-success status is
    /// reported as [`UpstreamError::Rejected`] without reading any frame.
    fn open_stream(
        &self,
        request: CompletionRequest,
    ) -> impl std::future::Future<Output = Result<UpstreamBody, UpstreamError>> + Send;
}
