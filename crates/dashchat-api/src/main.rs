//! dashchat CLI and HTTP entry point.
//!
//! Binary name: `dashchat`
//!
//! Parses CLI arguments, initializes tracing, database, and services, then
//! dispatches to the command handler or starts the HTTP server.

mod cli;
mod http;
mod state;

use std::time::Duration;

use clap::Parser;

use cli::{Cli, Commands};
use dashchat_core::task::spawn_failure_reporter;
use dashchat_observe::tracing_setup::{init_tracing, shutdown_tracing, TracingOptions};
use state::AppState;

/// How long background tasks get to finish before they are cancelled.
const TASK_GRACE: Duration = Duration::from_secs(10);

/// How long to wait for the failure reporter after tasks are drained.
const REPORTER_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut tracing_options = TracingOptions::from_verbosity(cli.verbose);
    tracing_options.json = cli.json_logs;
    tracing_options.otel = cli.otel;
    init_tracing(&tracing_options).map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let (state, failures) = AppState::init().await?;
    let reporter = spawn_failure_reporter(failures);

    let result = match cli.command {
        Commands::Serve { port, host } => serve(state.clone(), host, port).await,
        Commands::IssueToken { user } => cli::token::issue_token(&state, user, cli.json).await,
        Commands::ClearHistory { user, project } => {
            cli::history::clear_history(&state, user, project.as_deref(), cli.json).await
        }
    };

    // Drain side effects, then let the reporter log whatever they sent.
    state.tasks.shutdown_within(TASK_GRACE).await;
    let db_pool = state.db_pool.clone();
    drop(state);
    if tokio::time::timeout(REPORTER_GRACE, reporter).await.is_err() {
        tracing::warn!("Background failure reporter did not finish in time");
    }
    db_pool.close().await;

    shutdown_tracing();
    result
}

async fn serve(state: AppState, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        %addr,
        data_dir = %state.data_dir.display(),
        upstream = %state.config.upstream.base_url,
        "dashchat listening"
    );
    println!(
        "  {} dashchat listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state.clone());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(in_flight = state.tasks.in_flight(), "Server stopped, draining background tasks");
    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
