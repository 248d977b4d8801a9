//! Task endpoints.
//!
//! Each endpoint runs the same work under a different cancellation source.
//! All of them answer with the same literal body once their handler body
//! completes, whether or not the work was cut short; cancellation is only
//! visible through the progress output and logs.
//!
//! The request-bound endpoints take a [`RequestAborted`] extractor rather
//! than reaching for an ambient per-request token, so every layer that
//! needs the signal receives it as a parameter.

use crate::abort::RequestAborted;
use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::State;
use axum::Json;
use cancelflow::cancellation::TimedCancellationSource;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

/// Body returned by every task endpoint.
pub const DONE: &str = "DONE!!!";

/// Runs the operation with no cancellation signal.
#[instrument(skip_all, fields(route = "no-cancellation", request_id = %uuid::Uuid::new_v4()))]
pub async fn no_cancellation(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    let marker = state.random.next_marker();
    state.operation.execute(marker, None).await?;
    Ok(DONE)
}

/// Runs the operation under a fixed time budget.
///
/// The timer is released when this handler returns or is dropped.
#[instrument(skip_all, fields(route = "with-cancellation-source", request_id = %uuid::Uuid::new_v4()))]
pub async fn with_cancellation_source(
    State(state): State<AppState>,
) -> Result<&'static str, ApiError> {
    let source = TimedCancellationSource::new(state.config.cancellation_budget());
    let marker = state.random.next_marker();

    state.operation.execute(marker, Some(&*source.token())).await?;
    Ok(DONE)
}

/// Runs the operation with the request-lifetime signal.
#[instrument(skip_all, fields(route = "with-request-cancellation", request_id = %uuid::Uuid::new_v4()))]
pub async fn with_request_cancellation(
    State(state): State<AppState>,
    aborted: RequestAborted,
) -> Result<&'static str, ApiError> {
    let operation = Arc::clone(&state.operation);
    let marker = state.random.next_marker();

    aborted
        .run(move |token| async move { operation.execute(marker, Some(&*token)).await })
        .await??;
    Ok(DONE)
}

/// Issues the configured raw query with the request-lifetime signal.
#[instrument(skip_all, fields(route = "with-ef-query-cancellation", request_id = %uuid::Uuid::new_v4()))]
pub async fn with_query_cancellation(
    State(state): State<AppState>,
    aborted: RequestAborted,
) -> Result<&'static str, ApiError> {
    let executor = Arc::clone(&state.executor);
    let sql = state.config.query.clone();

    let result = aborted
        .run(move |token| async move { executor.execute_raw(&sql, &token).await })
        .await?;

    match result {
        Ok(rows) => {
            info!(rows = rows.rows.len(), "Query finished");
        }
        Err(e) if e.is_cancellation() => {
            info!(error = %e, "Query cancelled");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(DONE)
}

/// Health check endpoint.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
