//! Conversation history, session identity, context assembly, and the
//! service that ties them to the relay.

pub mod context;
pub mod history;
pub mod service;
pub mod session_key;
