//! CLI command definitions and dispatch for the `dashchat` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod history;
pub mod token;

use clap::{Parser, Subcommand};

/// Project-scoped chat relay for the dashboard.
#[derive(Parser)]
#[command(name = "dashchat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Port to listen on (defaults to `[server] port`).
        #[arg(long, short)]
        port: Option<u16>,

        /// Host to bind to (defaults to `[server] host`).
        #[arg(long)]
        host: Option<String>,
    },

    /// Issue a bearer token for an existing dashboard user.
    IssueToken {
        /// Dashboard user id.
        #[arg(long)]
        user: i64,
    },

    /// Delete a user's chat history for one project (or the unbound session).
    ClearHistory {
        /// Dashboard user id.
        #[arg(long)]
        user: i64,

        /// Project slug; omit for the session without a project.
        #[arg(long)]
        project: Option<String>,
    },
}
