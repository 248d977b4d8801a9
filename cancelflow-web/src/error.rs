//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cancelflow::errors::CancelflowError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An operation or query failed for a reason other than cancellation.
    #[error(transparent)]
    Cancelflow(#[from] CancelflowError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "error",
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}
