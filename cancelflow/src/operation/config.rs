//! Configuration for long-running operations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How `execute` treats failures other than cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log every failure and return normally.
    #[default]
    SwallowAll,
    /// Log and swallow cancellation, return every other failure.
    PropagateUnexpected,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwallowAll => write!(f, "swallow"),
            Self::PropagateUnexpected => write!(f, "propagate"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "swallow" | "swallow_all" => Ok(Self::SwallowAll),
            "propagate" | "propagate_unexpected" => Ok(Self::PropagateUnexpected),
            other => Err(format!("unknown failure policy: {other}")),
        }
    }
}

/// Shape of a long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationConfig {
    /// Number of sleep-and-report steps.
    #[serde(default = "default_step_count")]
    pub step_count: usize,
    /// Wait per step in milliseconds.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Failure handling in `execute`.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_step_count() -> usize {
    30
}

fn default_step_delay_ms() -> u64 {
    1000
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            step_count: default_step_count(),
            step_delay_ms: default_step_delay_ms(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl OperationConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of steps.
    #[must_use]
    pub fn with_step_count(mut self, step_count: usize) -> Self {
        self.step_count = step_count;
        self
    }

    /// Sets the wait per step.
    #[must_use]
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Returns the wait per step.
    #[must_use]
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    /// Returns the time a run takes when nothing cancels it.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.step_delay()
            .saturating_mul(u32::try_from(self.step_count).unwrap_or(u32::MAX))
    }
}
