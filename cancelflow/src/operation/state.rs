//! Operation lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a single operation run.
///
/// ```text
/// Running ──signal fires──▶ Cancelling ──▶ Completed
///    └────────all steps done──────────────▶ Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// Steps are being performed.
    #[default]
    Running,
    /// The signal fired during a wait; the run is winding down.
    Cancelling,
    /// The run has returned to its caller.
    Completed,
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Cancelling => write!(f, "cancelling"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl OperationState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if moving from `self` to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Cancelling)
                | (Self::Running, Self::Completed)
                | (Self::Cancelling, Self::Completed)
        )
    }
}
