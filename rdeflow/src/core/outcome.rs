//! Results produced by the poller, the provisioner and the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use super::{QualityGateReport, Resource, StatusClass};

/// The terminal result of one poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOutcome {
    /// Last observed status.
    pub final_status: String,
    /// Classification of `final_status`.
    pub class: StatusClass,
    /// Number of status fetches performed.
    pub attempts: u32,
    /// Time spent polling.
    pub elapsed: Duration,
}

impl PollOutcome {
    /// Elapsed time in whole seconds.
    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.as_secs()
    }
}

/// The result of a create-or-adopt call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionResult {
    /// Latest snapshot of the resource.
    pub resource: Resource,
    /// True when this call created the resource.
    pub created: bool,
    /// Poll outcome, `None` when an already-ready resource was adopted.
    pub outcome: Option<PollOutcome>,
    /// Credential handed out by the creation call. Only set when `created`.
    pub credential: Option<String>,
}

/// The operations the orchestrator can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Create or adopt an environment.
    Create,
    /// Delete an environment.
    Delete,
    /// Start and monitor a pipeline execution.
    RunPipeline,
    /// List accessible programs.
    ListPrograms,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Delete => write!(f, "delete"),
            Self::RunPipeline => write!(f, "run-pipeline"),
            Self::ListPrograms => write!(f, "list-programs"),
        }
    }
}

/// Everything a run hands to the output sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationResult {
    /// Which operation produced this result.
    pub operation: OperationKind,
    /// Flat key/value outputs, ordered by key.
    pub outputs: BTreeMap<String, String>,
    /// Keys in `outputs` whose values must be masked.
    pub secret_outputs: BTreeSet<String>,
    /// Tabular report for the run summary.
    pub report: Option<QualityGateReport>,
}

impl OrchestrationResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            outputs: BTreeMap::new(),
            secret_outputs: BTreeSet::new(),
            report: None,
        }
    }

    /// Adds a plain output.
    #[must_use]
    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    /// Adds an output whose value must be masked.
    #[must_use]
    pub fn with_secret_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.secret_outputs.insert(key.clone());
        self.outputs.insert(key, value.into());
        self
    }

    /// Attaches a report.
    #[must_use]
    pub fn with_report(mut self, report: QualityGateReport) -> Self {
        self.report = Some(report);
        self
    }

    /// Looks up an output value.
    #[must_use]
    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }

    /// Returns true if the key holds a secret.
    #[must_use]
    pub fn is_secret(&self, key: &str) -> bool {
        self.secret_outputs.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_outputs_are_tracked() {
        let result = OrchestrationResult::new(OperationKind::Create)
            .with_output("id", "1")
            .with_secret_output("credential", "s3cr3t");

        assert_eq!(result.output("id"), Some("1"));
        assert_eq!(result.output("credential"), Some("s3cr3t"));
        assert!(result.is_secret("credential"));
        assert!(!result.is_secret("id"));
    }

    #[test]
    fn test_operation_kind_display_matches_serde() {
        for kind in [
            OperationKind::Create,
            OperationKind::Delete,
            OperationKind::RunPipeline,
            OperationKind::ListPrograms,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_elapsed_seconds_truncates() {
        let outcome = PollOutcome {
            final_status: "ready".into(),
            class: StatusClass::Ready,
            attempts: 3,
            elapsed: Duration::from_millis(30_900),
        };
        assert_eq!(outcome.elapsed_seconds(), 30);
    }
}
