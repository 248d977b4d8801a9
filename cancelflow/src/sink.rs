//! Progress sinks.
//!
//! A long-running operation reports each completed step to a
//! [`ProgressSink`]. Sinks are injected rather than global so tests can
//! count exactly what was emitted.

use crate::errors::CancelflowError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use tracing::{debug, error, info, trace, warn, Level};

/// A single progress marker emitted after a completed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The identifying token of the run.
    pub marker: u32,
    /// The 1-based index of the completed step.
    pub step: usize,
    /// The number of steps the run was configured for.
    pub total: usize,
    /// When the step completed.
    pub emitted_at: DateTime<Utc>,
}

impl ProgressEvent {
    /// Creates a progress event stamped with the current time.
    #[must_use]
    pub fn new(marker: u32, step: usize, total: usize) -> Self {
        Self {
            marker,
            step,
            total,
            emitted_at: Utc::now(),
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*** Task is running: {} ***", self.marker)
    }
}

/// Receives progress events.
pub trait ProgressSink: Send + Sync {
    /// Reports a completed step.
    fn report(&self, event: &ProgressEvent) -> Result<(), CancelflowError>;
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn report(&self, _event: &ProgressEvent) -> Result<(), CancelflowError> {
        Ok(())
    }
}

/// A sink that writes one line per event to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleProgressSink;

impl ProgressSink for ConsoleProgressSink {
    fn report(&self, event: &ProgressEvent) -> Result<(), CancelflowError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{event}")?;
        stdout.flush()?;
        Ok(())
    }
}

/// A sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingProgressSink {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingProgressSink {
    /// Creates a new logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl ProgressSink for LoggingProgressSink {
    fn report(&self, event: &ProgressEvent) -> Result<(), CancelflowError> {
        let (marker, step, total) = (event.marker, event.step, event.total);
        match self.level {
            Level::TRACE => trace!(marker, step, total, "{event}"),
            Level::DEBUG => debug!(marker, step, total, "{event}"),
            Level::INFO => info!(marker, step, total, "{event}"),
            Level::WARN => warn!(marker, step, total, "{event}"),
            _ => error!(marker, step, total, "{event}"),
        }
        Ok(())
    }
}

/// A sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    events: RwLock<Vec<ProgressEvent>>,
}

impl CollectingProgressSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns the number of events carrying `marker`.
    #[must_use]
    pub fn count_for(&self, marker: u32) -> usize {
        self.events
            .read()
            .iter()
            .filter(|e| e.marker == marker)
            .count()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl ProgressSink for CollectingProgressSink {
    fn report(&self, event: &ProgressEvent) -> Result<(), CancelflowError> {
        self.events.write().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::Arc;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLog {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn report_at(level: Level) -> String {
        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(log.clone())
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            LoggingProgressSink::new(level)
                .report(&ProgressEvent::new(5, 1, 30))
                .unwrap();
        });
        log.contents()
    }

    #[test]
    fn test_logging_sink_honors_configured_level() {
        for (level, label) in [
            (Level::TRACE, "TRACE"),
            (Level::DEBUG, "DEBUG"),
            (Level::INFO, "INFO"),
            (Level::WARN, "WARN"),
            (Level::ERROR, "ERROR"),
        ] {
            let output = report_at(level);
            assert!(output.contains(label), "{label} missing from {output:?}");
            assert!(output.contains("*** Task is running: 5 ***"));
        }
    }

    #[test]
    fn test_event_display() {
        let event = ProgressEvent::new(417, 3, 30);
        assert_eq!(event.to_string(), "*** Task is running: 417 ***");
    }

    #[test]
    fn test_noop_and_logging_sinks_accept_events() {
        let event = ProgressEvent::new(1, 1, 1);
        assert!(NoOpProgressSink.report(&event).is_ok());
        assert!(LoggingProgressSink::default().report(&event).is_ok());
        assert!(LoggingProgressSink::debug().report(&event).is_ok());
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingProgressSink::new();
        assert!(sink.is_empty());

        sink.report(&ProgressEvent::new(7, 1, 2)).unwrap();
        sink.report(&ProgressEvent::new(7, 2, 2)).unwrap();
        sink.report(&ProgressEvent::new(9, 1, 2)).unwrap();

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.count_for(7), 2);
        assert_eq!(sink.count_for(9), 1);

        let steps: Vec<usize> = sink.events().iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![1, 2, 1]);

        sink.clear();
        assert!(sink.is_empty());
    }
}
