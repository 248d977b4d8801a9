//! Error types for cancelflow.
//!
//! Cancellation is the one condition callers are expected to handle
//! routinely, so it has its own type ([`Cancelled`]) and is kept apart from
//! the unexpected failures collected in [`CancelflowError`].

use thiserror::Error;

/// The main error type for cancelflow operations.
#[derive(Debug, Error)]
pub enum CancelflowError {
    /// The operation was interrupted by a cancellation signal.
    #[error("{0}")]
    Cancelled(#[from] Cancelled),

    /// A data-store query failed.
    #[error("{0}")]
    Query(#[from] QueryError),

    /// A progress sink rejected an event.
    #[error("Progress sink error: {0}")]
    Sink(String),

    /// A spawned task panicked or was aborted.
    #[error("Task error: {0}")]
    Task(String),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CancelflowError {
    /// Returns true if this error is the expected cancellation outcome.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Raised when a wait or query is interrupted by a cancellation signal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("A task was canceled: {reason}")]
pub struct Cancelled {
    /// The reason recorded on the token that fired.
    pub reason: String,
}

impl Cancelled {
    /// Creates a new cancellation error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors raised by a query executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The statement is not understood by the executor.
    #[error("Unsupported statement: {0}")]
    Unsupported(String),

    /// A `waitfor delay` literal could not be parsed.
    #[error("Invalid delay literal: {0}")]
    InvalidDelay(String),

    /// The statement referenced a table that does not exist.
    #[error("Invalid object name '{0}'")]
    UnknownTable(String),

    /// The query text contained no statements.
    #[error("Empty query")]
    Empty,
}

/// Result alias used across the crate.
pub type Result<T, E = CancelflowError> = std::result::Result<T, E>;
