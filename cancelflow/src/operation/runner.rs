//! The cancellable long-running operation.

use super::{FailurePolicy, OperationConfig, OperationState};
use crate::cancellation::{delay, CancellationToken};
use crate::errors::CancelflowError;
use crate::sink::{ProgressEvent, ProgressSink};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// Every step ran.
    Finished,
    /// The signal fired before the last step finished.
    Cancelled {
        /// Reason recorded on the token.
        reason: String,
    },
    /// An unexpected failure was logged and swallowed.
    Faulted {
        /// The failure's message.
        message: String,
    },
}

/// What a run did before returning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// The identifying marker of the run.
    pub marker: u32,
    /// Steps the run was configured for.
    pub requested_steps: usize,
    /// Steps that completed and were reported.
    pub completed_steps: usize,
    /// How the run ended.
    pub termination: Termination,
}

impl OperationOutcome {
    /// Returns true if every requested step completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.termination, Termination::Finished)
    }

    /// Returns true if the run was cut short by cancellation.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        matches!(self.termination, Termination::Cancelled { .. })
    }

    /// Returns the state the run ended in. Every returned run is `Completed`.
    #[must_use]
    pub fn state(&self) -> OperationState {
        OperationState::Completed
    }
}

/// Performs a fixed number of interruptible sleep-and-report steps.
///
/// The wait inside each step is the only suspension point. When the token
/// fires, the wait returns at once and the interrupted step reports nothing.
pub struct LongRunningOperation {
    config: OperationConfig,
    sink: Arc<dyn ProgressSink>,
}

impl LongRunningOperation {
    /// Creates an operation that reports to `sink`.
    pub fn new(config: OperationConfig, sink: Arc<dyn ProgressSink>) -> Self {
        Self { config, sink }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &OperationConfig {
        &self.config
    }

    /// Runs the steps.
    ///
    /// Cancellation is a normal outcome ([`Termination::Cancelled`]); only
    /// unexpected failures, such as a sink error, are returned as `Err`.
    pub async fn run(
        &self,
        marker: u32,
        token: Option<&CancellationToken>,
    ) -> Result<OperationOutcome, CancelflowError> {
        let mut completed = 0;
        let termination = self.run_steps(marker, token, &mut completed).await?;
        Ok(self.outcome(marker, completed, termination))
    }

    /// Runs the steps and applies the configured [`FailurePolicy`].
    ///
    /// Cancellation is always logged and swallowed. Other failures are
    /// logged and swallowed under `SwallowAll`, and returned under
    /// `PropagateUnexpected`.
    pub async fn execute(
        &self,
        marker: u32,
        token: Option<&CancellationToken>,
    ) -> Result<OperationOutcome, CancelflowError> {
        let mut completed = 0;
        let termination = match self.run_steps(marker, token, &mut completed).await {
            Ok(termination) => termination,
            Err(e) => {
                error!(marker, completed_steps = completed, error = %e, "Operation failed");
                match self.config.failure_policy {
                    FailurePolicy::SwallowAll => Termination::Faulted {
                        message: e.to_string(),
                    },
                    FailurePolicy::PropagateUnexpected => return Err(e),
                }
            }
        };

        match &termination {
            Termination::Finished => {
                info!(marker, completed_steps = completed, "Operation finished");
            }
            Termination::Cancelled { reason } => {
                info!(marker, completed_steps = completed, reason = %reason, "Operation cancelled");
            }
            Termination::Faulted { .. } => {}
        }

        Ok(self.outcome(marker, completed, termination))
    }

    async fn run_steps(
        &self,
        marker: u32,
        token: Option<&CancellationToken>,
        completed: &mut usize,
    ) -> Result<Termination, CancelflowError> {
        let total = self.config.step_count;
        let step_delay = self.config.step_delay();
        let mut state = OperationState::Running;

        for step in 1..=total {
            if let Err(cancelled) = delay(step_delay, token).await {
                advance(&mut state, OperationState::Cancelling, marker);
                advance(&mut state, OperationState::Completed, marker);
                return Ok(Termination::Cancelled {
                    reason: cancelled.reason,
                });
            }

            self.sink.report(&ProgressEvent::new(marker, step, total))?;
            *completed = step;
        }

        advance(&mut state, OperationState::Completed, marker);
        Ok(Termination::Finished)
    }

    fn outcome(&self, marker: u32, completed: usize, termination: Termination) -> OperationOutcome {
        OperationOutcome {
            marker,
            requested_steps: self.config.step_count,
            completed_steps: completed,
            termination,
        }
    }
}

fn advance(state: &mut OperationState, next: OperationState, marker: u32) {
    debug_assert!(state.can_transition_to(next), "{state} -> {next}");
    debug!(marker, from = %state, to = %next, "Operation state changed");
    *state = next;
}

impl std::fmt::Debug for LongRunningOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongRunningOperation")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
