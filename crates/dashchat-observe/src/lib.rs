//! Observability setup for dashchat: tracing subscriber and optional
//! OpenTelemetry export.

pub mod tracing_setup;
