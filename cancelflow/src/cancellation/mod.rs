//! Cooperative cancellation primitives.
//!
//! This module provides:
//! - CancellationToken, a one-way signal that can be awaited, chained and linked
//! - Interruptible waits that return the moment a token fires
//! - TimedCancellationSource for time-bound signals with guaranteed timer release
//! - DropGuard for tying a signal to the lifetime of a scope
//! - StructuredTaskGroup for forwarding one signal into several tasks

mod guard;
mod source;
mod task_group;
mod token;
mod wait;

pub use guard::DropGuard;
pub use source::TimedCancellationSource;
pub use task_group::StructuredTaskGroup;
pub use token::{CancelCallback, CancellationToken, DEFAULT_CANCEL_REASON};
pub use wait::{delay, until_cancelled};
