//! Error types for rdeflow.
//!
//! Every failure that ends a run maps onto one [`RdeflowError`] variant.
//! Remote call failures are carried as [`ClientError`], which keeps
//! transient faults apart from terminal ones so that only the status read
//! inside a poll loop is retried.

use std::time::Duration;
use thiserror::Error;

use crate::core::QualityGateReport;

/// Convenience alias used across the crate.
pub type Result<T, E = RdeflowError> = std::result::Result<T, E>;

/// The main error type for rdeflow operations.
#[derive(Debug, Error)]
pub enum RdeflowError {
    /// A required input was missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No usable credential or the remote rejected it.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The poll loop ran out of attempts before a terminal status.
    #[error(
        "Timed out after {attempts} attempts ({}s), last status: {}",
        .elapsed.as_secs(),
        .last_status.as_deref().unwrap_or("<none>")
    )]
    Timeout {
        /// Last status observed, if any fetch returned one.
        last_status: Option<String>,
        /// Number of status fetches performed.
        attempts: u32,
        /// Wall-clock time spent polling.
        elapsed: Duration,
    },

    /// A terminal failure status was observed.
    #[error("Resource reached failed status '{status}' after {attempts} attempts")]
    ResourceFailed {
        /// The failed status string as reported by the remote.
        status: String,
        /// Number of status fetches performed.
        attempts: u32,
        /// Quality-gate table of a failed pipeline execution, if one was
        /// available.
        report: Option<Box<QualityGateReport>>,
    },

    /// An existing resource cannot be adopted in its current state.
    #[error("Resource '{name}' is in status '{status}' and cannot be adopted")]
    Conflict {
        /// The requested resource name.
        name: String,
        /// The blocking status.
        status: String,
    },

    /// The remote rejected a delete call.
    #[error("Failed to delete resource '{id}': {source}")]
    Deletion {
        /// Id of the resource that could not be deleted.
        id: String,
        /// The underlying client error.
        #[source]
        source: ClientError,
    },

    /// A resource expected to exist could not be found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A remote call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RdeflowError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a failed-status error without a report.
    #[must_use]
    pub fn resource_failed(status: impl Into<String>, attempts: u32) -> Self {
        Self::ResourceFailed {
            status: status.into(),
            attempts,
            report: None,
        }
    }

    /// The quality-gate table attached to a failed execution.
    #[must_use]
    pub fn report(&self) -> Option<&QualityGateReport> {
        match self {
            Self::ResourceFailed { report, .. } => report.as_deref(),
            _ => None,
        }
    }

    /// Returns true if retrying the failed call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Client(err) if err.is_transient())
    }

    /// Returns the status string attached to this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::Timeout { last_status, .. } => last_status.as_deref(),
            Self::ResourceFailed { status, .. } | Self::Conflict { status, .. } => Some(status),
            _ => None,
        }
    }
}

/// Errors raised by a [`CloudManagerClient`](crate::client::CloudManagerClient).
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Connection failure, request timeout, HTTP 429 or HTTP 5xx.
    #[error("Transient error: {0}")]
    Transient(String),

    /// HTTP 401 or 403.
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Any other non-success response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Classifies an HTTP status code and body into a client error.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Unauthorized { status, message },
            429 | 500..=599 => Self::Transient(format!("HTTP {status}: {message}")),
            _ => Self::Api { status, message },
        }
    }

    /// Returns true for faults that may clear up on their own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Transient(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), err.to_string())
        } else {
            Self::Transient(err.to_string())
        }
    }
}

/// Maps unauthorized client errors onto [`RdeflowError::Authentication`].
pub(crate) fn lift_client_error(err: ClientError) -> RdeflowError {
    match err {
        ClientError::Unauthorized { status, message } => {
            RdeflowError::Authentication(format!("HTTP {status}: {message}"))
        }
        other => RdeflowError::Client(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(ClientError::from_status(503, "down").is_transient());
        assert!(ClientError::from_status(429, "slow down").is_transient());
        assert!(matches!(
            ClientError::from_status(404, "missing"),
            ClientError::Api { status: 404, .. }
        ));
        assert!(matches!(
            ClientError::from_status(401, "nope"),
            ClientError::Unauthorized { status: 401, .. }
        ));
    }

    #[test]
    fn test_is_retryable_only_for_transient_client_errors() {
        let transient = RdeflowError::Client(ClientError::Transient("reset".into()));
        let api = RdeflowError::Client(ClientError::from_status(400, "bad"));
        let failed = RdeflowError::resource_failed("failed", 2);

        assert!(transient.is_retryable());
        assert!(!api.is_retryable());
        assert!(!failed.is_retryable());
    }

    #[test]
    fn test_timeout_display_includes_last_status() {
        let err = RdeflowError::Timeout {
            last_status: Some("creating".into()),
            attempts: 30,
            elapsed: Duration::from_secs(300),
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 30 attempts (300s), last status: creating"
        );
        assert_eq!(err.status(), Some("creating"));
    }

    #[test]
    fn test_unauthorized_lifts_to_authentication() {
        let err = lift_client_error(ClientError::from_status(403, "forbidden"));
        assert!(matches!(err, RdeflowError::Authentication(_)));

        let err = lift_client_error(ClientError::from_status(500, "boom"));
        assert!(matches!(err, RdeflowError::Client(_)));
    }
}
