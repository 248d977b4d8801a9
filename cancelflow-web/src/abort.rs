//! Cancellation tied to the lifetime of an inbound request.
//!
//! When a client disconnects, hyper drops the handler future. A
//! [`RequestAborted`] held by the handler turns that drop into a fired
//! token, which work running on its own task can observe and honor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use cancelflow::cancellation::{CancellationToken, DropGuard};
use cancelflow::errors::CancelflowError;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn, Instrument};

/// Reason recorded on the token when the request goes away.
pub const REQUEST_ABORTED_REASON: &str = "request aborted by client";

/// Extractor supplying a token that fires when the request is aborted.
#[derive(Debug)]
pub struct RequestAborted {
    token: Arc<CancellationToken>,
    guard: DropGuard,
}

impl RequestAborted {
    /// Creates a fresh request-lifetime token.
    #[must_use]
    pub fn new() -> Self {
        let token = CancellationToken::new();
        let guard = DropGuard::new(Arc::clone(&token), REQUEST_ABORTED_REASON);
        Self { token, guard }
    }

    /// Returns the request-lifetime token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Runs `work` on its own task with the request token and waits for it.
    ///
    /// If the calling future is dropped before `work` finishes, the token
    /// fires and `work` winds down on its own. If `work` finishes first the
    /// token is left untouched.
    pub async fn run<F, Fut, T>(self, work: F) -> Result<T, CancelflowError>
    where
        F: FnOnce(Arc<CancellationToken>) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let Self { token, mut guard } = self;

        let handle = tokio::spawn(work(token).in_current_span());
        let result = handle
            .await
            .map_err(|e| CancelflowError::Task(e.to_string()));

        guard.disarm();
        match &result {
            Ok(_) => debug!("Request work finished before the client went away"),
            Err(e) => warn!(error = %e, "Request work did not finish cleanly"),
        }
        result
    }
}

impl Default for RequestAborted {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> FromRequestParts<S> for RequestAborted
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::new())
    }
}
