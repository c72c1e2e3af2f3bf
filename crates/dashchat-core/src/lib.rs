//! Chat relay logic and repository trait definitions for dashchat.
//!
//! This crate defines the "ports" (repository and upstream traits) that the
//! infrastructure layer implements, plus the pure pieces of the relay:
//! permission resolution, session keys, context assembly, and the
//! streaming state machine. It depends only on `dashchat-types` -- never on
//! `dashchat-infra` or any database/HTTP crate.

pub mod chat;
pub mod permission;
pub mod relay;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;
