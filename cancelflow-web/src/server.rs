//! HTTP server for the cancellation demonstration.

use crate::config::{Config, ProgressSinkKind};
use crate::handlers::{
    health_check, no_cancellation, with_cancellation_source, with_query_cancellation,
    with_request_cancellation,
};
use axum::routing::get;
use axum::Router;
use cancelflow::operation::LongRunningOperation;
use cancelflow::query::{InMemoryDatabase, QueryExecutor};
use cancelflow::random::{RandomSource, ThreadRandom};
use cancelflow::sink::{ConsoleProgressSink, LoggingProgressSink, ProgressSink};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Arc<Config>,
    /// The long-running operation every task endpoint runs.
    pub operation: Arc<LongRunningOperation>,
    /// Executor behind the query endpoint.
    pub executor: Arc<dyn QueryExecutor>,
    /// Source of identifying markers.
    pub random: Arc<dyn RandomSource>,
}

impl AppState {
    /// Builds state from explicit collaborators.
    pub fn new(
        config: Config,
        sink: Arc<dyn ProgressSink>,
        executor: Arc<dyn QueryExecutor>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let operation = Arc::new(LongRunningOperation::new(config.operation_config(), sink));
        Self {
            config: Arc::new(config),
            operation,
            executor,
            random,
        }
    }

    /// Builds state with the production collaborators the configuration selects.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        let sink: Arc<dyn ProgressSink> = match config.progress_sink {
            ProgressSinkKind::Console => Arc::new(ConsoleProgressSink),
            ProgressSinkKind::Log => Arc::new(LoggingProgressSink::default()),
        };
        Self::new(
            config,
            sink,
            Arc::new(InMemoryDatabase::demo()),
            Arc::new(ThreadRandom),
        )
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/tasks/no-cancellation", get(no_cancellation))
        .route("/tasks/with-cancellation-source", get(with_cancellation_source))
        .route("/tasks/with-request-cancellation", get(with_request_cancellation))
        .route("/tasks/with-ef-query-cancellation", get(with_query_cancellation))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
}
