//! Drop guard that ties a token to a scope.

use super::CancellationToken;
use std::sync::Arc;
use tracing::debug;

/// Cancels its token when dropped.
///
/// Holding the guard inside a future ties the token to that future's
/// lifetime: if the future is dropped before finishing, the token fires.
pub struct DropGuard {
    token: Option<Arc<CancellationToken>>,
    reason: String,
}

impl DropGuard {
    /// Creates a guard that cancels `token` with `reason` on drop.
    pub fn new(token: Arc<CancellationToken>, reason: impl Into<String>) -> Self {
        Self {
            token: Some(token),
            reason: reason.into(),
        }
    }

    /// Returns the guarded token, if the guard is still armed.
    #[must_use]
    pub fn token(&self) -> Option<&Arc<CancellationToken>> {
        self.token.as_ref()
    }

    /// Disarms the guard, leaving the token untouched on drop.
    pub fn disarm(&mut self) -> Option<Arc<CancellationToken>> {
        self.token.take()
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            debug!(reason = %self.reason, "Drop guard fired");
            token.cancel(std::mem::take(&mut self.reason));
        }
    }
}

impl std::fmt::Debug for DropGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropGuard")
            .field("armed", &self.token.is_some())
            .field("reason", &self.reason)
            .finish()
    }
}
