//! Status classification for remote resources.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Environment statuses that count as usable.
pub const ENVIRONMENT_STATUS_READY: &[&str] = &["ready", "updating", "created"];
/// Environment statuses that will never recover on their own.
pub const ENVIRONMENT_STATUS_BROKEN: &[&str] = &["failed", "restore_failed"];
/// Environment statuses reported while provisioning is in flight.
pub const ENVIRONMENT_STATUS_CREATING: &[&str] = &["creating"];
/// Environment statuses reported while teardown is in flight.
pub const ENVIRONMENT_STATUS_DELETING: &[&str] = &["deleting", "deleted"];

/// The single successful terminal execution status.
pub const EXECUTION_STATUS_FINISHED: &str = "FINISHED";
/// Execution statuses that end the run unsuccessfully.
pub const EXECUTION_STATUS_FAILED: &[&str] = &["ERROR", "FAILED", "CANCELLED"];
/// Execution statuses of a run that has not terminated yet.
pub const EXECUTION_STATUS_ACTIVE: &[&str] = &["NOT_STARTED", "RUNNING", "CANCELLING"];

/// Classification of a raw status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// A status was observed but is not terminal.
    Pending,
    /// Terminal success.
    Ready,
    /// Terminal failure.
    Failed,
    /// No status was observed.
    Unknown,
}

impl StatusClass {
    /// Returns true if the class ends a poll loop.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The status words a resource kind uses, grouped by meaning.
///
/// Matching is case-insensitive. `ready` and `failed` must be disjoint;
/// `creating` and `deleting` are consulted by the provisioner and the
/// orchestrator to decide whether an existing resource can be adopted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusVocabulary {
    ready: BTreeSet<String>,
    failed: BTreeSet<String>,
    creating: BTreeSet<String>,
    deleting: BTreeSet<String>,
}

fn normalize(status: &str) -> String {
    status.trim().to_ascii_lowercase()
}

fn word_set(words: &[&str]) -> BTreeSet<String> {
    words.iter().map(|w| normalize(w)).collect()
}

impl StatusVocabulary {
    /// Creates a vocabulary from ready and failed words.
    #[must_use]
    pub fn new(ready: &[&str], failed: &[&str]) -> Self {
        Self {
            ready: word_set(ready),
            failed: word_set(failed),
            ..Self::default()
        }
    }

    /// Sets the words meaning "still being created".
    #[must_use]
    pub fn with_creating(mut self, creating: &[&str]) -> Self {
        self.creating = word_set(creating);
        self
    }

    /// Sets the words meaning "being torn down".
    #[must_use]
    pub fn with_deleting(mut self, deleting: &[&str]) -> Self {
        self.deleting = word_set(deleting);
        self
    }

    /// Vocabulary for rapid development environments.
    #[must_use]
    pub fn environment() -> Self {
        Self::new(ENVIRONMENT_STATUS_READY, ENVIRONMENT_STATUS_BROKEN)
            .with_creating(ENVIRONMENT_STATUS_CREATING)
            .with_deleting(ENVIRONMENT_STATUS_DELETING)
    }

    /// Vocabulary for pipeline executions.
    #[must_use]
    pub fn execution() -> Self {
        Self::new(&[EXECUTION_STATUS_FINISHED], EXECUTION_STATUS_FAILED)
            .with_creating(EXECUTION_STATUS_ACTIVE)
    }

    /// Classifies a raw status. `None` is [`StatusClass::Unknown`].
    #[must_use]
    pub fn classify(&self, status: Option<&str>) -> StatusClass {
        let Some(status) = status else {
            return StatusClass::Unknown;
        };
        let status = normalize(status);
        if self.ready.contains(&status) {
            StatusClass::Ready
        } else if self.failed.contains(&status) {
            StatusClass::Failed
        } else {
            StatusClass::Pending
        }
    }

    /// Returns true if the status means the resource is still being created.
    #[must_use]
    pub fn is_creating(&self, status: &str) -> bool {
        self.creating.contains(&normalize(status))
    }

    /// Returns true if the status means the resource is being torn down.
    #[must_use]
    pub fn is_deleting(&self, status: &str) -> bool {
        self.deleting.contains(&normalize(status))
    }

    /// Returns true if no word is both ready and failed.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.ready.is_disjoint(&self.failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_classification() {
        let vocab = StatusVocabulary::environment();
        assert_eq!(vocab.classify(Some("ready")), StatusClass::Ready);
        assert_eq!(vocab.classify(Some("updating")), StatusClass::Ready);
        assert_eq!(vocab.classify(Some("restore_failed")), StatusClass::Failed);
        assert_eq!(vocab.classify(Some("creating")), StatusClass::Pending);
        assert_eq!(vocab.classify(None), StatusClass::Unknown);
    }

    #[test]
    fn test_classification_ignores_case() {
        let vocab = StatusVocabulary::execution();
        assert_eq!(vocab.classify(Some("finished")), StatusClass::Ready);
        assert_eq!(vocab.classify(Some("Error")), StatusClass::Failed);
        assert_eq!(vocab.classify(Some("RUNNING")), StatusClass::Pending);
    }

    #[test]
    fn test_creating_and_deleting_words() {
        let vocab = StatusVocabulary::environment();
        assert!(vocab.is_creating("Creating"));
        assert!(vocab.is_deleting("deleting"));
        assert!(!vocab.is_deleting("ready"));
    }

    #[test]
    fn test_builtin_vocabularies_are_consistent() {
        assert!(StatusVocabulary::environment().is_consistent());
        assert!(StatusVocabulary::execution().is_consistent());
        assert!(!StatusVocabulary::new(&["done"], &["DONE"]).is_consistent());
    }

    #[test]
    fn test_status_class_is_terminal() {
        assert!(StatusClass::Ready.is_terminal());
        assert!(StatusClass::Failed.is_terminal());
        assert!(!StatusClass::Pending.is_terminal());
        assert!(!StatusClass::Unknown.is_terminal());
    }

    #[test]
    fn test_status_class_serialize() {
        let json = serde_json::to_string(&StatusClass::Ready).unwrap();
        assert_eq!(json, r#""ready""#);
    }
}
