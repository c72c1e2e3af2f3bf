//! Infrastructure layer for dashchat.
//!
//! Contains implementations of the ports defined in `dashchat-core`: SQLite
//! storage for turns, grants, projects, and bearer tokens; the streaming
//! HTTP upstream client; and configuration loading.

pub mod config;
pub mod sqlite;
pub mod upstream;
