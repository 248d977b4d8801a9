//! Structured task group for operations that share one cancellation signal.

use super::{CancellationToken, DropGuard};
use crate::errors::CancelflowError;
use futures::future::join_all;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type GroupHandle = (String, JoinHandle<Result<(), CancelflowError>>);

/// A group of related tasks that all observe the same token.
///
/// A task that errors or panics cancels the token as it exits, so the
/// remaining tasks wind down at their next suspension point. Cancellation
/// results are not treated as errors.
pub struct StructuredTaskGroup {
    /// The cancellation token handed to every task.
    cancel_token: Arc<CancellationToken>,
    /// Handles to spawned tasks.
    handles: Mutex<Vec<GroupHandle>>,
}

impl StructuredTaskGroup {
    /// Creates a new task group with its own token.
    #[must_use]
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Creates a task group that forwards an existing token to its tasks.
    #[must_use]
    pub fn with_token(cancel_token: Arc<CancellationToken>) -> Self {
        Self {
            cancel_token,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> &Arc<CancellationToken> {
        &self.cancel_token
    }

    /// Spawns a task in the group.
    pub fn spawn<F, Fut>(&self, name: &str, task: F)
    where
        F: FnOnce(Arc<CancellationToken>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), CancelflowError>> + Send + 'static,
    {
        let token = Arc::clone(&self.cancel_token);
        let task_name = name.to_string();
        let handle = tokio::spawn(async move {
            let mut guard =
                DropGuard::new(Arc::clone(&token), format!("task {task_name} panicked"));
            let result = task(Arc::clone(&token)).await;
            guard.disarm();

            if let Err(e) = &result {
                if !e.is_cancellation() {
                    token.cancel(e.to_string());
                }
            }
            result
        });

        debug!(task = name, "Spawned task in group");
        self.handles.lock().push((name.to_string(), handle));
    }

    /// Cancels all tasks in the group.
    pub fn cancel_all(&self, reason: &str) {
        self.cancel_token.cancel(reason);
    }

    /// Waits for all tasks to complete.
    ///
    /// Returns the first non-cancellation error, in spawn order, if any.
    pub async fn wait(&self) -> Result<(), CancelflowError> {
        let handles: Vec<GroupHandle> = std::mem::take(&mut *self.handles.lock());
        let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();

        let mut first_error = None;
        for (name, result) in names.into_iter().zip(join_all(handles).await) {
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) if e.is_cancellation() => {
                    debug!(task = %name, "Task observed cancellation");
                    continue;
                }
                Ok(Err(e)) => e,
                Err(join_error) => CancelflowError::Task(format!("{name}: {join_error}")),
            };

            warn!(task = %name, error = %error, "Task in group failed");
            first_error.get_or_insert(error);
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Returns the number of pending tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.handles.lock().len()
    }
}

impl Default for StructuredTaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StructuredTaskGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredTaskGroup")
            .field("task_count", &self.task_count())
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}
