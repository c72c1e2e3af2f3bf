//! Upstream completion service adapters.

pub mod http;
