//! Cancellable long-running operations.

mod config;
mod runner;
mod state;

pub use config::{FailurePolicy, OperationConfig};
pub use runner::{LongRunningOperation, OperationOutcome, Termination};
pub use state::OperationState;
