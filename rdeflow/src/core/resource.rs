//! Snapshots of remote entities as returned by the Cloud Manager API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A HAL navigation link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Target URL.
    pub href: String,
}

/// A remote resource (an environment) as seen in one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Server-assigned id.
    pub id: String,
    /// Human-assigned name used for lookup.
    #[serde(default)]
    pub name: Option<String>,
    /// Raw status string.
    #[serde(default)]
    pub status: Option<String>,
    /// Resource type, e.g. `rde`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Owning program.
    #[serde(default)]
    pub program_id: Option<String>,
    /// Navigation links keyed by relation.
    #[serde(default, rename = "_links")]
    pub links: BTreeMap<String, Link>,
    /// Credential returned once by the creation call.
    #[serde(default, skip_serializing)]
    pub credential: Option<String>,
}

impl Resource {
    /// Creates a resource snapshot with an id, a name and a status.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            status: Some(status.into()),
            kind: None,
            description: None,
            program_id: None,
            links: BTreeMap::new(),
            credential: None,
        }
    }

    /// Sets the resource type.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a navigation link.
    #[must_use]
    pub fn with_link(mut self, rel: impl Into<String>, href: impl Into<String>) -> Self {
        self.links.insert(rel.into(), Link { href: href.into() });
        self
    }

    /// Returns true if the resource carries the given name.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    /// Returns the status, or an empty string when none was reported.
    #[must_use]
    pub fn status_str(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }
}

/// Request body for creating an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSpec {
    /// Environment name.
    pub name: String,
    /// Environment type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EnvironmentSpec {
    /// Default environment type.
    pub const DEFAULT_KIND: &'static str = "rde";

    /// Creates a spec for an RDE with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Self::DEFAULT_KIND.to_string(),
            description: None,
        }
    }

    /// Sets the environment type.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A Cloud Manager program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Program id.
    pub id: String,
    /// Program name.
    #[serde(default)]
    pub name: Option<String>,
}

/// State of one step of a pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    /// Step state id.
    #[serde(default)]
    pub id: Option<String>,
    /// Step id within the pipeline definition.
    #[serde(default)]
    pub step_id: Option<String>,
    /// Phase the step belongs to.
    #[serde(default)]
    pub phase_id: Option<String>,
    /// Step action, e.g. `build` or `codeQuality`.
    pub action: String,
    /// Step status.
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionEmbedded {
    #[serde(default)]
    step_states: Vec<StepState>,
}

/// A pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// Execution id.
    pub id: String,
    /// Owning program.
    #[serde(default)]
    pub program_id: Option<String>,
    /// Pipeline that was started.
    #[serde(default)]
    pub pipeline_id: Option<String>,
    /// Raw execution status.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "_embedded")]
    embedded: ExecutionEmbedded,
}

impl Execution {
    /// Creates an execution snapshot.
    #[must_use]
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            program_id: None,
            pipeline_id: None,
            status: Some(status.into()),
            embedded: ExecutionEmbedded::default(),
        }
    }

    /// Appends a step state.
    #[must_use]
    pub fn with_step(mut self, action: impl Into<String>, status: impl Into<String>) -> Self {
        self.embedded.step_states.push(StepState {
            id: None,
            step_id: None,
            phase_id: None,
            action: action.into(),
            status: status.into(),
        });
        self
    }

    /// All step states in pipeline order.
    #[must_use]
    pub fn steps(&self) -> &[StepState] {
        &self.embedded.step_states
    }

    /// The step currently in progress: the first one that has started
    /// but not finished.
    #[must_use]
    pub fn current_step(&self) -> Option<&StepState> {
        self.steps().iter().find(|step| {
            let status = step.status.to_ascii_uppercase();
            status != "NOT_STARTED" && status != "FINISHED"
        })
    }

    /// Finds the step for an action.
    #[must_use]
    pub fn step_for_action(&self, action: &str) -> Option<&StepState> {
        self.steps().iter().find(|step| step.action == action)
    }
}

/// One quality-gate metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityGateMetric {
    /// Metric name.
    pub kpi: String,
    /// Gate severity, e.g. `critical`.
    #[serde(default)]
    pub severity: String,
    /// Whether the gate passed.
    #[serde(default)]
    pub passed: bool,
    /// Threshold.
    #[serde(default)]
    pub expected_value: String,
    /// Observed value.
    #[serde(default)]
    pub actual_value: String,
}

/// Quality-gate results of one execution step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityGateResults {
    /// Metrics, absent when the step produced none.
    #[serde(default)]
    pub metrics: Option<Vec<QualityGateMetric>>,
}
