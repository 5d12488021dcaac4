//! The bounded readiness-wait loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::observer::{LoggingPollObserver, PollAttempt, PollObserver};
use super::retry::{with_retry, RetryConfig};
use crate::core::{PollOutcome, StatusClass, StatusVocabulary};
use crate::errors::{lift_client_error, ClientError, RdeflowError, Result};

/// Default wait between environment status checks.
pub const ENVIRONMENT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Default total wait for an environment to become ready.
pub const ENVIRONMENT_MAX_WAIT: Duration = Duration::from_secs(5 * 60);
/// Default wait between execution status checks.
pub const EXECUTION_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Default total wait for a pipeline execution to finish.
pub const EXECUTION_MAX_WAIT: Duration = Duration::from_secs(2 * 60 * 60);

/// Timing of one poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep before every status fetch.
    pub interval: Duration,
    /// Total time budget; divided by `interval` to get the attempt budget.
    pub max_wait: Duration,
    /// Retry policy for transient errors of a single status fetch.
    pub retry: RetryConfig,
}

impl PollConfig {
    /// Creates a config with the default transient retry policy.
    #[must_use]
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self {
            interval,
            max_wait,
            retry: RetryConfig::default(),
        }
    }

    /// Defaults for environments: every 10 s for up to 5 minutes.
    #[must_use]
    pub fn environment() -> Self {
        Self::new(ENVIRONMENT_POLL_INTERVAL, ENVIRONMENT_MAX_WAIT)
    }

    /// Defaults for pipeline executions: every 30 s for up to 2 hours.
    #[must_use]
    pub fn execution() -> Self {
        Self::new(EXECUTION_POLL_INTERVAL, EXECUTION_MAX_WAIT)
    }

    /// Sets the transient retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// `floor(max_wait / interval)`, never less than one.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        let interval = self.interval.as_nanos();
        if interval == 0 {
            return 1;
        }
        let attempts = self.max_wait.as_nanos() / interval;
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }
}

/// Polls a status until it is terminal or the attempt budget runs out.
///
/// Every attempt sleeps `interval` first and then fetches. A ready status
/// returns at once, a failed status fails at once; neither waits for the
/// rest of the budget.
#[derive(Clone)]
pub struct ReadinessPoller {
    config: PollConfig,
    observer: Arc<dyn PollObserver>,
}

impl std::fmt::Debug for ReadinessPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessPoller")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReadinessPoller {
    /// Creates a poller logging each attempt.
    #[must_use]
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            observer: Arc::new(LoggingPollObserver::default()),
        }
    }

    /// Replaces the attempt observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PollObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The loop timing.
    #[must_use]
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Runs the loop.
    ///
    /// `fetch_status` returns the current raw status, or `None` when the
    /// remote reported none. Transient fetch errors are retried per
    /// [`PollConfig::retry`]; anything else aborts the loop.
    pub async fn poll<F, Fut>(
        &self,
        label: &str,
        vocabulary: &StatusVocabulary,
        mut fetch_status: F,
    ) -> Result<PollOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<Option<String>, ClientError>>,
    {
        debug_assert!(vocabulary.is_consistent(), "ready and failed statuses overlap");

        let max_attempts = self.config.max_attempts();
        let started = Instant::now();
        let mut last_status: Option<String> = None;

        for attempt in 1..=max_attempts {
            tokio::time::sleep(self.config.interval).await;

            let status = with_retry(&self.config.retry, ClientError::is_transient, &mut fetch_status)
                .await
                .map_err(lift_client_error)?;
            let class = vocabulary.classify(status.as_deref());

            self.observer.on_attempt(&PollAttempt {
                label: label.to_string(),
                attempt,
                max_attempts,
                status: status.clone(),
                class,
            });

            if status.is_some() {
                last_status.clone_from(&status);
            }

            match class {
                StatusClass::Ready => {
                    return Ok(PollOutcome {
                        final_status: status.unwrap_or_default(),
                        class,
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    });
                }
                StatusClass::Failed => {
                    return Err(RdeflowError::resource_failed(
                        status.unwrap_or_default(),
                        attempt,
                    ));
                }
                StatusClass::Pending | StatusClass::Unknown => {}
            }
        }

        tracing::warn!(
            resource = %label,
            attempts = max_attempts,
            last_status = last_status.as_deref().unwrap_or("<none>"),
            "Gave up waiting for a terminal status"
        );

        Err(RdeflowError::Timeout {
            last_status,
            attempts: max_attempts,
            elapsed: started.elapsed(),
        })
    }
}
