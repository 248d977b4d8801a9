//! Cancelflow web service binary.

use anyhow::{Context, Result};
use cancelflow_web::{serve, shutdown_signal, AppState, Config};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("cancelflow=info".parse()?)
                .add_directive("cancelflow_web=info".parse()?),
        )
        .init();

    let config = Config::from_env();
    info!(
        port = config.port,
        step_count = config.step_count,
        step_delay_ms = config.step_delay_ms,
        cancellation_budget_ms = config.cancellation_budget_ms,
        failure_policy = %config.failure_policy,
        progress_sink = %config.progress_sink,
        "Starting cancelflow web service"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(%addr, "Listening");

    serve(listener, AppState::from_config(config), shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}
