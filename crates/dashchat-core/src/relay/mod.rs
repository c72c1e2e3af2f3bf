//! Streaming relay between the upstream completion service and a client.
//!
//! One relay run serves one exchange and moves through:
//!
//! ```text
//! INIT -> CONNECTING -> UPSTREAM_ERROR
//!                    -> STREAMING -> DONE
//!                                 -> ABORTED
//! ```
//!
//! INIT (permission and project checks) happens in the caller before the
//! relay is started; the relay itself begins at CONNECTING. Every path out
//! of the relay ends with exactly one `data: [DONE]` frame, and the
//! assistant turn is persisted only on DONE.
//!
//! The relay is a lazily polled stream: nothing is read from the upstream
//! until the client pulls the next frame, and dropping the stream (client
//! disconnect) drops the upstream body with it.

pub mod accumulator;
pub mod frame;
pub mod upstream;

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use dashchat_types::chat::{SessionKey, Turn, TurnRole};
use dashchat_types::error::UpstreamError;
use dashchat_types::upstream::CompletionRequest;

use crate::chat::history::HistoryStore;

use self::accumulator::ResponseAccumulator;
use self::frame::{classify, done_frame, error_frame, forward_frame, LineDecoder, LineKind};
use self::upstream::CompletionUpstream;

/// Client-facing message for a mid-stream failure.
pub const STREAM_INTERRUPTED: &str = "Stream interrupted";

/// Frames sent to the client, one per item.
pub type ClientStream = Pin<Box<dyn Stream<Item = Bytes> + Send + 'static>>;

/// Hook run after the assistant turn is stored.
pub type AfterPersist = Box<dyn FnOnce(&Turn) + Send + 'static>;

/// Relay lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Init,
    Connecting,
    UpstreamError,
    Streaming,
    Done,
    Aborted,
}

impl RelayState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RelayState::UpstreamError | RelayState::Done | RelayState::Aborted
        )
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::Init => write!(f, "init"),
            RelayState::Connecting => write!(f, "connecting"),
            RelayState::UpstreamError => write!(f, "upstream_error"),
            RelayState::Streaming => write!(f, "streaming"),
            RelayState::Done => write!(f, "done"),
            RelayState::Aborted => write!(f, "aborted"),
        }
    }
}

/// What the relay does with one upstream line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction {
    Skip,
    Forward,
    Finish,
}

/// Decide what to do with a line and feed any payload to the accumulator.
///
/// Forwarding does not depend on whether the payload parsed: a `data:` line
/// is forwarded either way, and accumulation is attempted either way.
pub fn process_line(line: &[u8], accumulator: &mut ResponseAccumulator) -> LineAction {
    match classify(line) {
        LineKind::Blank | LineKind::Other => LineAction::Skip,
        LineKind::Done => LineAction::Finish,
        LineKind::Data(payload) => {
            if !accumulator.absorb(payload) {
                debug!(bytes = payload.len(), "Forwarding uninterpretable frame");
            }
            LineAction::Forward
        }
    }
}

/// Everything the relay needs for one exchange.
pub struct RelayExchange {
    pub user_id: i64,
    pub session_key: SessionKey,
    pub request: CompletionRequest,
    pub after_persist: Option<AfterPersist>,
}

/// Opens the upstream stream and relays it to the client.
pub struct StreamRelay<H: HistoryStore, U: CompletionUpstream> {
    history: Arc<H>,
    upstream: Arc<U>,
    time_limit: Duration,
}

impl<H: HistoryStore, U: CompletionUpstream> Clone for StreamRelay<H, U> {
    fn clone(&self) -> Self {
        Self {
            history: Arc::clone(&self.history),
            upstream: Arc::clone(&self.upstream),
            time_limit: self.time_limit,
        }
    }
}

impl<H, U> StreamRelay<H, U>
where
    H: HistoryStore + 'static,
    U: CompletionUpstream + 'static,
{
    /// Create a relay. `time_limit` bounds a whole exchange.
    pub fn new(history: Arc<H>, upstream: Arc<U>, time_limit: Duration) -> Self {
        Self {
            history,
            upstream,
            time_limit,
        }
    }

    /// Run one exchange as a stream of client frames.
    pub fn relay(&self, exchange: RelayExchange) -> ClientStream {
        let history = Arc::clone(&self.history);
        let upstream = Arc::clone(&self.upstream);
        let deadline = Instant::now() + self.time_limit;

        let RelayExchange {
            user_id,
            session_key,
            request,
            after_persist,
        } = exchange;

        Box::pin(async_stream::stream! {
            let mut state = RelayState::Init;
            transition(&mut state, RelayState::Connecting, &session_key);

            let opened = timeout_at(deadline, upstream.open_stream(request)).await;
            let mut body = match opened {
                Ok(Ok(body)) => body,
                Ok(Err(UpstreamError::Rejected { status, body })) => {
                    transition(&mut state, RelayState::UpstreamError, &session_key);
                    warn!(
                        session_key = %session_key,
                        status,
                        body = %body,
                        "Upstream rejected chat request"
                    );
                    yield error_frame(&format!("Upstream error: {status}"));
                    yield done_frame();
                    return;
                }
                Ok(Err(e)) => {
                    transition(&mut state, RelayState::Aborted, &session_key);
                    warn!(session_key = %session_key, error = %e, "Upstream connect failed");
                    yield error_frame(STREAM_INTERRUPTED);
                    yield done_frame();
                    return;
                }
                Err(_) => {
                    transition(&mut state, RelayState::Aborted, &session_key);
                    warn!(session_key = %session_key, error = %UpstreamError::Timeout, "Upstream connect timed out");
                    yield error_frame(STREAM_INTERRUPTED);
                    yield done_frame();
                    return;
                }
            };

            transition(&mut state, RelayState::Streaming, &session_key);
            let mut decoder = LineDecoder::new();
            let mut accumulator = ResponseAccumulator::new();
            let mut finished = false;

            while !finished {
                let next = match timeout_at(deadline, body.next()).await {
                    Ok(next) => next,
                    Err(_) => Some(Err(UpstreamError::Timeout)),
                };

                let lines = match next {
                    Some(Ok(chunk)) => decoder.push(&chunk),
                    Some(Err(e)) => {
                        transition(&mut state, RelayState::Aborted, &session_key);
                        warn!(
                            session_key = %session_key,
                            error = %e,
                            discarded_chars = accumulator.text().len(),
                            "Upstream stream aborted"
                        );
                        drop(body);
                        yield error_frame(STREAM_INTERRUPTED);
                        yield done_frame();
                        return;
                    }
                    None => {
                        // Clean end of body without a sentinel.
                        finished = true;
                        decoder.finish().into_iter().collect()
                    }
                };

                for line in lines {
                    match process_line(&line, &mut accumulator) {
                        LineAction::Skip => {}
                        LineAction::Forward => yield forward_frame(&line),
                        LineAction::Finish => {
                            finished = true;
                            break;
                        }
                    }
                }
            }

            drop(body);
            transition(&mut state, RelayState::Done, &session_key);
            let skipped = accumulator.frames_skipped();

            if !accumulator.is_empty() {
                let turn = Turn::new(
                    user_id,
                    session_key.clone(),
                    TurnRole::Assistant,
                    accumulator.into_text(),
                );
                match history.append(&turn).await {
                    Ok(()) => {
                        info!(
                            session_key = %session_key,
                            chars = turn.content.len(),
                            skipped,
                            "Assistant turn persisted"
                        );
                        if let Some(hook) = after_persist {
                            hook(&turn);
                        }
                    }
                    Err(e) => {
                        error!(session_key = %session_key, error = %e, "Failed to persist assistant turn");
                    }
                }
            } else {
                info!(session_key = %session_key, skipped, "Exchange finished without assistant text");
            }

            yield done_frame();
        })
    }
}

fn transition(state: &mut RelayState, next: RelayState, session_key: &SessionKey) {
    if next.is_terminal() {
        info!(session_key = %session_key, from = %state, to = %next, "Relay finished");
    } else {
        debug!(session_key = %session_key, from = %state, to = %next, "Relay state transition");
    }
    *state = next;
}
