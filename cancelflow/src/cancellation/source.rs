//! Time-bound cancellation sources.

use super::CancellationToken;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Owns a token that cancels itself once a time budget elapses.
///
/// The budget is enforced by a timer task. The timer is released exactly
/// once: by an explicit [`release`](Self::release) or when the source is
/// dropped, whichever happens first. Releasing does not cancel the token.
///
/// Must be created from within a Tokio runtime.
pub struct TimedCancellationSource {
    /// The token handed out to cooperating operations.
    token: Arc<CancellationToken>,
    /// The configured budget.
    budget: Duration,
    /// The timer task, `None` once released.
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl TimedCancellationSource {
    /// Creates a source whose token fires after `budget`.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        let token = CancellationToken::new();
        let timer_token = Arc::clone(&token);

        let timer = tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            debug!(budget_ms = budget.as_millis(), "Cancellation budget elapsed");
            timer_token.cancel(format!("time budget of {budget:?} elapsed"));
        });

        Self {
            token,
            budget,
            timer: Mutex::new(Some(timer)),
        }
    }

    /// Returns the token governed by this source.
    #[must_use]
    pub fn token(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.token)
    }

    /// Returns the configured budget.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Releases the timer.
    ///
    /// Returns true the first time the timer is released, false afterwards.
    pub fn release(&self) -> bool {
        match self.timer.lock().take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }

    /// Returns true once the timer has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.timer.lock().is_none()
    }
}

impl Drop for TimedCancellationSource {
    fn drop(&mut self) {
        if self.release() {
            debug!("Released cancellation timer on drop");
        }
    }
}

impl std::fmt::Debug for TimedCancellationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedCancellationSource")
            .field("budget", &self.budget)
            .field("cancelled", &self.token.is_cancelled())
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_budget() {
        let source = TimedCancellationSource::new(Duration::from_secs(10));
        let token = source.token();
        let start = Instant::now();

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(!token.is_cancelled());

        token.cancelled().await;
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert!(token.reason().unwrap().contains("time budget"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_is_idempotent() {
        let source = TimedCancellationSource::new(Duration::from_secs(1));

        assert!(!source.is_released());
        assert!(source.release());
        assert!(!source.release());
        assert!(source.is_released());
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_timer_never_fires() {
        let source = TimedCancellationSource::new(Duration::from_secs(1));
        let token = source.token();
        source.release();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_timer() {
        let token = {
            let source = TimedCancellationSource::new(Duration::from_secs(1));
            source.token()
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_released_when_scope_panics() {
        let (tx, rx) = tokio::sync::oneshot::channel();

        let task = tokio::spawn(async move {
            let source = TimedCancellationSource::new(Duration::from_secs(1));
            let _ = tx.send(source.token());
            panic!("unrelated fault");
        });

        let token = rx.await.unwrap();
        assert!(task.await.unwrap_err().is_panic());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!token.is_cancelled());
    }
}
