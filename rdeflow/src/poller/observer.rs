//! Observers notified on every poll attempt.

use parking_lot::RwLock;
use tracing::{debug, info, Level};

use crate::core::StatusClass;

/// One status fetch made by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollAttempt {
    /// What is being polled, e.g. `environment 42`.
    pub label: String,
    /// 1-based attempt number.
    pub attempt: u32,
    /// Attempt budget of the loop.
    pub max_attempts: u32,
    /// Status returned by the fetch, if any.
    pub status: Option<String>,
    /// Classification of `status`.
    pub class: StatusClass,
}

/// Receives poll attempts.
///
/// Observers must not fail; they are for logging and diagnostics only.
pub trait PollObserver: Send + Sync {
    /// Called after each status fetch.
    fn on_attempt(&self, attempt: &PollAttempt);
}

/// Discards all attempts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPollObserver;

impl PollObserver for NoOpPollObserver {
    fn on_attempt(&self, _attempt: &PollAttempt) {}
}

/// Logs attempts through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingPollObserver {
    level: Level,
}

impl Default for LoggingPollObserver {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingPollObserver {
    /// Creates an observer logging at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level observer.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl PollObserver for LoggingPollObserver {
    fn on_attempt(&self, attempt: &PollAttempt) {
        let status = attempt.status.as_deref().unwrap_or("<none>");
        if self.level == Level::DEBUG {
            debug!(
                resource = %attempt.label,
                attempt = attempt.attempt,
                max_attempts = attempt.max_attempts,
                class = %attempt.class,
                "Status of {}: {}", attempt.label, status
            );
        } else {
            info!(
                resource = %attempt.label,
                attempt = attempt.attempt,
                max_attempts = attempt.max_attempts,
                class = %attempt.class,
                "Status of {}: {}", attempt.label, status
            );
        }
    }
}

/// Keeps every attempt in memory.
#[derive(Debug, Default)]
pub struct CollectingPollObserver {
    attempts: RwLock<Vec<PollAttempt>>,
}

impl CollectingPollObserver {
    /// Creates an empty observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All attempts seen so far.
    #[must_use]
    pub fn attempts(&self) -> Vec<PollAttempt> {
        self.attempts.read().clone()
    }

    /// The observed statuses, in order.
    #[must_use]
    pub fn statuses(&self) -> Vec<Option<String>> {
        self.attempts.read().iter().map(|a| a.status.clone()).collect()
    }

    /// Number of attempts seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.read().len()
    }

    /// Returns true if nothing was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.read().is_empty()
    }
}

impl PollObserver for CollectingPollObserver {
    fn on_attempt(&self, attempt: &PollAttempt) {
        self.attempts.write().push(attempt.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(n: u32, status: &str) -> PollAttempt {
        PollAttempt {
            label: "environment 1".into(),
            attempt: n,
            max_attempts: 3,
            status: Some(status.into()),
            class: StatusClass::Pending,
        }
    }

    #[test]
    fn test_collecting_observer_records_in_order() {
        let observer = CollectingPollObserver::new();
        assert!(observer.is_empty());

        observer.on_attempt(&attempt(1, "creating"));
        observer.on_attempt(&attempt(2, "ready"));

        assert_eq!(observer.len(), 2);
        assert_eq!(
            observer.statuses(),
            vec![Some("creating".to_string()), Some("ready".to_string())]
        );
    }

    #[test]
    fn test_logging_observer_does_not_panic_without_subscriber() {
        LoggingPollObserver::default().on_attempt(&attempt(1, "creating"));
        LoggingPollObserver::debug().on_attempt(&attempt(1, "creating"));
        NoOpPollObserver.on_attempt(&attempt(1, "creating"));
    }
}
