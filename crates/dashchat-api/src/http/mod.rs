//! HTTP layer for dashchat.
//!
//! Axum routes under `/chat/` with bearer token authentication and
//! `{"error": ...}` JSON errors.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
