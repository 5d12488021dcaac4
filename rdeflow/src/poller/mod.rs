//! Status polling.
//!
//! This module provides:
//! - The readiness poller and its timing configuration
//! - Retry with backoff for transient status-read failures
//! - Observers for per-attempt logging

mod observer;
mod readiness;
mod retry;

pub use observer::{
    CollectingPollObserver, LoggingPollObserver, NoOpPollObserver, PollAttempt, PollObserver,
};
pub use readiness::{
    PollConfig, ReadinessPoller, ENVIRONMENT_MAX_WAIT, ENVIRONMENT_POLL_INTERVAL,
    EXECUTION_MAX_WAIT, EXECUTION_POLL_INTERVAL,
};
pub use retry::{
    should_retry, with_retry, BackoffStrategy, JitterStrategy, RetryConfig, RetryDecision,
    RetryState,
};
