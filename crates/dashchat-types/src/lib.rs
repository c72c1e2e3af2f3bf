//! Shared domain types for dashchat.
//!
//! This crate contains the domain types used across the chat relay:
//! capability tiers and grants, projects, caller identity, conversation
//! turns, the upstream completion wire format, configuration, and error
//! types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod identity;
pub mod permission;
pub mod project;
pub mod upstream;
