//! Cancellation token for cooperative cancellation.

use crate::errors::Cancelled;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tracing::warn;

/// Reason reported when a token is observed without one.
pub const DEFAULT_CANCEL_REASON: &str = "cancellation requested";

/// A callback type for cancellation notifications. Receives the reason.
pub type CancelCallback = Box<dyn FnOnce(&str) + Send>;

/// A token for cooperative cancellation.
///
/// The state only ever moves from "not requested" to "requested". Holders
/// share it as `Arc<CancellationToken>` and either poll [`is_cancelled`]
/// or await [`cancelled`].
///
/// [`is_cancelled`]: CancellationToken::is_cancelled
/// [`cancelled`]: CancellationToken::cancelled
#[derive(Default)]
pub struct CancellationToken {
    /// Whether cancellation has been requested.
    cancelled: AtomicBool,
    /// The reason for cancellation (first one wins).
    reason: RwLock<Option<String>>,
    /// Callbacks to invoke on cancellation.
    callbacks: Mutex<Vec<CancelCallback>>,
    /// Derived tokens to cancel along with this one.
    children: Mutex<Vec<Weak<CancellationToken>>>,
    /// Wakes tasks parked in `cancelled()`.
    notify: Notify,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a token that is already cancelled.
    #[must_use]
    pub fn cancelled_with(reason: impl Into<String>) -> Arc<Self> {
        let token = Self::new();
        token.cancel(reason);
        token
    }

    /// Requests cancellation with a reason.
    ///
    /// This is idempotent - only the first reason is kept.
    /// Callbacks are invoked immediately. Panics in callbacks are logged and suppressed.
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();

        // The reason is written before the flag is published so that anyone
        // observing `is_cancelled() == true` also sees a reason.
        let mut slot = self.reason.write();
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        *slot = Some(reason.clone());
        self.cancelled.store(true, Ordering::SeqCst);
        drop(slot);

        self.notify.notify_waiters();

        let children: Vec<Weak<Self>> = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel(reason.as_str());
        }

        let callbacks: Vec<CancelCallback> = std::mem::take(&mut *self.callbacks.lock());
        for callback in callbacks {
            invoke(callback, &reason);
        }
    }

    /// Registers a callback to be invoked on cancellation.
    ///
    /// If already cancelled, the callback is invoked immediately.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce(&str) + Send + 'static,
    {
        {
            let mut callbacks = self.callbacks.lock();
            if !self.is_cancelled() {
                callbacks.push(Box::new(callback));
                return;
            }
        }

        let reason = self.reason().unwrap_or_default();
        invoke(Box::new(callback), &reason);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Builds the error that reports this token's cancellation.
    #[must_use]
    pub fn cancellation_error(&self) -> Cancelled {
        Cancelled::new(
            self.reason()
                .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string()),
        )
    }

    /// Waits until cancellation is requested.
    ///
    /// Resolves immediately if the token is already cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking the flag so a concurrent
            // `cancel` cannot slip between the check and the await.
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }

            notified.await;
        }
    }

    /// Derives a child token.
    ///
    /// The child is cancelled whenever this token is. Cancelling the child
    /// has no effect on this token or on sibling children. The parent holds
    /// only a weak link, and links to dropped children are pruned on the
    /// next derivation.
    #[must_use]
    pub fn child(&self) -> Arc<Self> {
        let child = Self::new();
        self.forward_to(&child);
        child
    }

    /// Creates a token that is cancelled as soon as any of `parents` is.
    #[must_use]
    pub fn linked(parents: &[&Self]) -> Arc<Self> {
        let linked = Self::new();
        for parent in parents {
            parent.forward_to(&linked);
        }
        linked
    }

    fn forward_to(&self, target: &Arc<Self>) {
        {
            let mut children = self.children.lock();
            if !self.is_cancelled() {
                children.retain(|child| child.strong_count() > 0);
                children.push(Arc::downgrade(target));
                return;
            }
        }

        target.cancel(self.cancellation_error().reason);
    }
}

fn invoke(callback: CancelCallback, reason: &str) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        callback(reason);
    })) {
        warn!("Cancellation callback panicked: {:?}", e);
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_token_default_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[test]
    fn test_token_cancel() {
        let token = CancellationToken::new();
        token.cancel("User requested");

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("User requested".to_string()));
    }

    #[test]
    fn test_token_cancel_idempotent() {
        let token = CancellationToken::new();
        token.cancel("First reason");
        token.cancel("Second reason");

        // First reason wins, and the token stays cancelled
        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("First reason".to_string()));
    }

    #[test]
    fn test_on_cancel_before_cancellation() {
        let token = CancellationToken::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        token.on_cancel(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 0);

        token.cancel("test");
        token.cancel("again");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_cancel_after_cancellation() {
        let token = CancellationToken::cancelled_with("early");

        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();

        // Should invoke immediately
        token.on_cancel(move |reason| {
            *seen_clone.lock() = Some(reason.to_string());
        });

        assert_eq!(seen.lock().as_deref(), Some("early"));
    }

    #[test]
    fn test_callback_panic_suppressed() {
        let token = CancellationToken::new();

        token.on_cancel(|_| {
            panic!("Intentional panic");
        });

        // Should not panic
        token.cancel("test");
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_child_follows_parent() {
        let parent = CancellationToken::new();
        let child = parent.child();

        parent.cancel("shutdown");

        assert!(child.is_cancelled());
        assert_eq!(child.reason(), Some("shutdown".to_string()));
    }

    #[test]
    fn test_child_cancel_leaves_parent_and_siblings() {
        let parent = CancellationToken::new();
        let first = parent.child();
        let second = parent.child();

        first.cancel("only this one");

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_child_of_cancelled_parent_is_cancelled() {
        let parent = CancellationToken::cancelled_with("gone");
        let child = parent.child();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_linked_fires_on_any_parent() {
        let deadline = CancellationToken::new();
        let request = CancellationToken::new();
        let linked = CancellationToken::linked(&[&deadline, &request]);

        assert!(!linked.is_cancelled());
        request.cancel("client went away");

        assert!(linked.is_cancelled());
        assert!(!deadline.is_cancelled());
        assert_eq!(linked.reason(), Some("client went away".to_string()));
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_already_cancelled() {
        let token = CancellationToken::cancelled_with("done");
        tokio::time::timeout(Duration::from_millis(50), token.cancelled())
            .await
            .expect("already-cancelled token must resolve");
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let token = CancellationToken::new();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let token = token.clone();
                tokio::spawn(async move { token.cancelled().await })
            })
            .collect();

        tokio::task::yield_now().await;
        token.cancel("wake up");

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should be woken")
                .expect("waiter should not panic");
        }
    }

    #[test]
    fn test_cancelled_pending_until_cancel() {
        let token = CancellationToken::new();
        let mut waiter = tokio_test::task::spawn(token.cancelled());

        tokio_test::assert_pending!(waiter.poll());

        token.cancel("now");

        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[test]
    fn test_dropped_children_are_pruned() {
        let parent = CancellationToken::new();
        for _ in 0..100 {
            drop(parent.child());
        }

        let live = parent.child();
        assert_eq!(parent.children.lock().len(), 1);

        parent.cancel("stop");
        assert!(live.is_cancelled());
    }

    #[test]
    fn test_cancellation_error_uses_reason_or_default() {
        let token = CancellationToken::new();
        assert_eq!(token.cancellation_error().reason, DEFAULT_CANCEL_REASON);

        token.cancel("budget");
        assert_eq!(token.cancellation_error().reason, "budget");
    }
}
