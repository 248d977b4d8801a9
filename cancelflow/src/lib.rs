//! # Cancelflow
//!
//! Cooperative cancellation for long-running async work.
//!
//! Cancelflow threads a single cancellation signal through an async call
//! chain and shows the ways such a signal can originate:
//!
//! - **No signal**: the work always runs to completion
//! - **Time budget**: a [`TimedCancellationSource`] fires after a fixed duration
//!   and releases its timer on every exit path
//! - **Scope lifetime**: a [`DropGuard`] fires when the owning future is dropped,
//!   such as when an HTTP client disconnects
//! - **Propagation**: the same token is forwarded into downstream work, such as
//!   a [`QueryExecutor`], so aborting the caller aborts the callee
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cancelflow::prelude::*;
//!
//! let operation = LongRunningOperation::new(
//!     OperationConfig::default(),
//!     Arc::new(ConsoleProgressSink),
//! );
//!
//! let source = TimedCancellationSource::new(Duration::from_secs(10));
//! let outcome = operation.execute(ThreadRandom.next_marker(), Some(&*source.token())).await?;
//! assert!(outcome.was_cancelled());
//! ```
//!
//! [`TimedCancellationSource`]: cancellation::TimedCancellationSource
//! [`DropGuard`]: cancellation::DropGuard
//! [`QueryExecutor`]: query::QueryExecutor

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod errors;
pub mod operation;
pub mod query;
pub mod random;
pub mod sink;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{
        delay, until_cancelled, CancellationToken, DropGuard, StructuredTaskGroup,
        TimedCancellationSource,
    };
    pub use crate::errors::{Cancelled, CancelflowError, QueryError};
    pub use crate::operation::{
        FailurePolicy, LongRunningOperation, OperationConfig, OperationOutcome, OperationState,
        Termination,
    };
    pub use crate::query::{InMemoryDatabase, QueryExecutor, QueryResult, DEMO_QUERY};
    pub use crate::random::{FixedRandom, RandomSource, SeededRandom, ThreadRandom};
    pub use crate::sink::{
        CollectingProgressSink, ConsoleProgressSink, LoggingProgressSink, NoOpProgressSink,
        ProgressEvent, ProgressSink,
    };
}
