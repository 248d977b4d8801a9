//! Configuration for the cancelflow web service.

use cancelflow::operation::{FailurePolicy, OperationConfig};
use cancelflow::query::DEMO_QUERY;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Where progress lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressSinkKind {
    /// One line per step on stdout.
    #[default]
    Console,
    /// One tracing event per step.
    Log,
}

impl FromStr for ProgressSinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "stdout" => Ok(Self::Console),
            "log" | "tracing" => Ok(Self::Log),
            other => Err(format!("unknown progress sink: {other}")),
        }
    }
}

impl fmt::Display for ProgressSinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => write!(f, "console"),
            Self::Log => write!(f, "log"),
        }
    }
}

/// Web service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Steps per long-running operation.
    pub step_count: usize,
    /// Wait per step in milliseconds.
    pub step_delay_ms: u64,
    /// Budget of the timer-bound endpoint in milliseconds.
    pub cancellation_budget_ms: u64,
    /// Raw query issued by the query endpoint.
    pub query: String,
    /// Failure handling for operations.
    pub failure_policy: FailurePolicy,
    /// Progress output.
    pub progress_sink: ProgressSinkKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env_parse("CANCELFLOW_PORT").unwrap_or(5000),
            step_count: env_parse("CANCELFLOW_STEP_COUNT").unwrap_or(30),
            step_delay_ms: env_parse("CANCELFLOW_STEP_DELAY_MS").unwrap_or(1000),
            cancellation_budget_ms: env_parse("CANCELFLOW_CANCELLATION_BUDGET_MS")
                .unwrap_or(10_000),
            query: env::var("CANCELFLOW_QUERY")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEMO_QUERY.to_string()),
            failure_policy: env_parse("CANCELFLOW_FAILURE_POLICY").unwrap_or_default(),
            progress_sink: env_parse("CANCELFLOW_PROGRESS_SINK").unwrap_or_default(),
        }
    }
}

impl Config {
    /// Loads the configuration from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Returns the shape of the long-running operation.
    #[must_use]
    pub fn operation_config(&self) -> OperationConfig {
        OperationConfig::new()
            .with_step_count(self.step_count)
            .with_step_delay(Duration::from_millis(self.step_delay_ms))
            .with_failure_policy(self.failure_policy)
    }

    /// Returns the budget of the timer-bound endpoint.
    #[must_use]
    pub fn cancellation_budget(&self) -> Duration {
        Duration::from_millis(self.cancellation_budget_ms)
    }
}

fn env_parse<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(
                key,
                value = %raw,
                error = %e,
                "Ignoring invalid environment value, using default"
            );
            None
        }
    }
}
