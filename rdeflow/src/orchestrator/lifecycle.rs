//! Top-level sequencing of the create, delete and pipeline flows.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::{CloudManagerClient, EnvironmentCollection, ResourceCollection};
use crate::core::{
    EnvironmentSpec, OperationKind, OrchestrationResult, ProvisionResult, QualityGateReport,
    Resource, StatusClass, StatusVocabulary,
};
use crate::errors::{lift_client_error, RdeflowError, Result};
use crate::poller::{LoggingPollObserver, PollConfig, PollObserver, ReadinessPoller};
use crate::provisioner::{IdempotentProvisioner, RelistConfig};

/// Step action whose metrics make up the quality-gate report.
pub const QUALITY_GATE_ACTION: &str = "codeQuality";

/// One unit of work for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Operation {
    /// Create an environment, or adopt the one with the same name.
    Create {
        /// Owning program.
        program_id: String,
        /// Requested environment.
        spec: EnvironmentSpec,
    },
    /// Delete the environment with a given name.
    Delete {
        /// Owning program.
        program_id: String,
        /// Environment name.
        name: String,
    },
    /// Start a pipeline and wait for it to finish.
    RunPipeline {
        /// Owning program.
        program_id: String,
        /// Pipeline to start.
        pipeline_id: String,
    },
    /// List the programs the credential can see.
    ListPrograms,
}

impl Operation {
    /// The kind of this operation.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Delete { .. } => OperationKind::Delete,
            Self::RunPipeline { .. } => OperationKind::RunPipeline,
            Self::ListPrograms => OperationKind::ListPrograms,
        }
    }
}

/// Tunables of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Poll timing for environments.
    pub environment_poll: PollConfig,
    /// Poll timing for pipeline executions.
    pub execution_poll: PollConfig,
    /// Re-list policy after environment creation.
    pub relist: RelistConfig,
    /// Step action to read quality-gate metrics from.
    pub quality_gate_action: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            environment_poll: PollConfig::environment(),
            execution_poll: PollConfig::execution(),
            relist: RelistConfig::default(),
            quality_gate_action: QUALITY_GATE_ACTION.to_string(),
        }
    }
}

/// Runs one [`Operation`] against a Cloud Manager client.
///
/// The client is handed in by the caller and lives for one invocation.
#[derive(Clone)]
pub struct LifecycleOrchestrator {
    client: Arc<dyn CloudManagerClient>,
    settings: OrchestratorSettings,
    observer: Arc<dyn PollObserver>,
}

impl std::fmt::Debug for LifecycleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleOrchestrator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl LifecycleOrchestrator {
    /// Creates an orchestrator with default settings.
    #[must_use]
    pub fn new(client: Arc<dyn CloudManagerClient>) -> Self {
        Self {
            client,
            settings: OrchestratorSettings::default(),
            observer: Arc::new(LoggingPollObserver::default()),
        }
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the poll observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PollObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The active settings.
    #[must_use]
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Runs `operation` to completion.
    pub async fn execute(&self, operation: &Operation) -> Result<OrchestrationResult> {
        info!(operation = %operation.kind(), "Starting operation");
        let result = match operation {
            Operation::Create { program_id, spec } => self.create(program_id, spec).await,
            Operation::Delete { program_id, name } => self.delete(program_id, name).await,
            Operation::RunPipeline {
                program_id,
                pipeline_id,
            } => self.run_pipeline(program_id, pipeline_id).await,
            Operation::ListPrograms => self.list_programs().await,
        };
        match &result {
            Ok(_) => info!(operation = %operation.kind(), "Operation completed"),
            Err(e) => warn!(operation = %operation.kind(), error = %e, "Operation failed"),
        }
        result
    }

    fn poller(&self, config: &PollConfig) -> ReadinessPoller {
        ReadinessPoller::new(config.clone()).with_observer(Arc::clone(&self.observer))
    }

    async fn create(&self, program_id: &str, spec: &EnvironmentSpec) -> Result<OrchestrationResult> {
        let collection = EnvironmentCollection::new(Arc::clone(&self.client), program_id);
        let poller = self.poller(&self.settings.environment_poll);
        let provision = IdempotentProvisioner::new(&collection, &poller)
            .with_relist(self.settings.relist)
            .provision(spec)
            .await?;

        if provision.created {
            info!(id = %provision.resource.id, "Environment created and ready");
        } else {
            info!(id = %provision.resource.id, "Using existing environment");
        }

        Ok(environment_outputs(program_id, &provision))
    }

    async fn delete(&self, program_id: &str, name: &str) -> Result<OrchestrationResult> {
        let collection = EnvironmentCollection::new(Arc::clone(&self.client), program_id);
        let poller = self.poller(&self.settings.environment_poll);
        let provisioner = IdempotentProvisioner::new(&collection, &poller);
        let vocabulary = collection.vocabulary();
        let result = OrchestrationResult::new(OperationKind::Delete);

        let Some(existing) = provisioner.find(name).await? else {
            info!(environment = name, "No environment to delete");
            return Ok(result.with_output("deleted", "false"));
        };
        let id = existing.id.clone();
        let result = result.with_output("environment_id", &id);

        if vocabulary.is_deleting(existing.status_str()) {
            info!(environment = name, id = %id, status = %existing.status_str(), "Environment already being deleted");
            return Ok(result.with_output("deleted", "false"));
        }

        if vocabulary.is_creating(existing.status_str()) {
            info!(environment = name, id = %id, "Environment still creating, waiting before delete");
            match provisioner.wait_until_ready(existing).await {
                Ok(_) => {}
                Err(RdeflowError::ResourceFailed { status, .. }) => {
                    warn!(id = %id, status = %status, "Environment failed while creating, deleting anyway");
                }
                Err(e) => return Err(e),
            }
        }

        collection
            .delete(&id)
            .await
            .map_err(|source| RdeflowError::Deletion {
                id: id.clone(),
                source,
            })?;
        info!(environment = name, id = %id, "Environment deletion requested");

        Ok(result.with_output("deleted", "true"))
    }

    async fn run_pipeline(&self, program_id: &str, pipeline_id: &str) -> Result<OrchestrationResult> {
        let execution = self
            .client
            .create_execution(program_id, pipeline_id)
            .await
            .map_err(lift_client_error)?;
        info!(execution_id = %execution.id, "Started pipeline execution");

        let vocabulary = StatusVocabulary::execution();
        let poller = self.poller(&self.settings.execution_poll);
        let client = &*self.client;
        let vocabulary_ref = &vocabulary;
        let execution_id = execution.id.as_str();

        let polled = poller
            .poll(
                &format!("execution {execution_id}"),
                &vocabulary,
                move || async move {
                    let execution = client
                        .get_execution(program_id, pipeline_id, execution_id)
                        .await?;
                    if vocabulary_ref.classify(execution.status.as_deref()) == StatusClass::Pending {
                        if let Some(step) = execution.current_step() {
                            info!(action = %step.action, status = %step.status, "Current pipeline execution step");
                        }
                    }
                    Ok(execution.status)
                },
            )
            .await;

        let outcome = match polled {
            Ok(outcome) => outcome,
            Err(RdeflowError::ResourceFailed {
                status, attempts, ..
            }) => {
                warn!(execution_id, status = %status, "Pipeline execution failed");
                let report = self
                    .quality_gate_report(program_id, pipeline_id, execution_id)
                    .await;
                return Err(RdeflowError::ResourceFailed {
                    status,
                    attempts,
                    report: report.map(Box::new),
                });
            }
            Err(e) => return Err(e),
        };
        info!(execution_id, status = %outcome.final_status, "Pipeline execution finished");

        let mut result = OrchestrationResult::new(OperationKind::RunPipeline)
            .with_output("execution_id", execution_id)
            .with_output("execution_status", &outcome.final_status);

        if let Some(report) = self
            .quality_gate_report(program_id, pipeline_id, execution_id)
            .await
        {
            result = result
                .with_output("quality_gates_failed", report.failed_count().to_string())
                .with_report(report);
        }

        Ok(result)
    }

    async fn quality_gate_report(
        &self,
        program_id: &str,
        pipeline_id: &str,
        execution_id: &str,
    ) -> Option<QualityGateReport> {
        match self
            .client
            .get_quality_gate_results(
                program_id,
                pipeline_id,
                execution_id,
                &self.settings.quality_gate_action,
            )
            .await
        {
            Ok(results) => results
                .metrics
                .map(|metrics| QualityGateReport::from_metrics(&metrics)),
            Err(e) => {
                warn!(error = %e, "Could not fetch quality gate results");
                None
            }
        }
    }

    async fn list_programs(&self) -> Result<OrchestrationResult> {
        let programs = self.client.list_programs().await.map_err(lift_client_error)?;
        info!(count = programs.len(), "Listed programs");
        Ok(OrchestrationResult::new(OperationKind::ListPrograms)
            .with_output("programs", serde_json::to_string(&programs)?)
            .with_output("program_count", programs.len().to_string()))
    }
}

/// Output key for a link relation: the last non-empty path segment of the
/// rel, e.g. `http://ns.adobe.com/adobecloud/rel/author` becomes `link_author`.
#[must_use]
pub fn link_output_key(rel: &str) -> String {
    let segment = rel
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("unnamed");
    let name: String = segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("link_{name}")
}

/// First of `key`, `key_2`, `key_3`, ... not yet used in `result`.
fn unique_output_key(result: &OrchestrationResult, key: String) -> String {
    if result.output(&key).is_none() {
        return key;
    }
    (2..)
        .map(|n| format!("{key}_{n}"))
        .find(|candidate| result.output(candidate).is_none())
        .unwrap_or(key)
}

fn environment_outputs(program_id: &str, provision: &ProvisionResult) -> OrchestrationResult {
    let resource: &Resource = &provision.resource;
    let mut result = OrchestrationResult::new(OperationKind::Create)
        .with_output("program_id", program_id)
        .with_output("environment_id", &resource.id)
        .with_output("environment_name", resource.name.clone().unwrap_or_default())
        .with_output("environment_type", resource.kind.clone().unwrap_or_default())
        .with_output(
            "environment_description",
            resource.description.clone().unwrap_or_default(),
        )
        .with_output("environment_status", resource.status_str())
        .with_output("created", provision.created.to_string());

    for (rel, link) in &resource.links {
        let base = link_output_key(rel);
        let key = unique_output_key(&result, base.clone());
        if key != base {
            warn!(rel = %rel, key = %key, "Link output key already taken, using suffix");
        }
        result = result.with_output(key, &link.href);
    }

    if provision.created {
        if let Some(credential) = &provision.credential {
            result = result.with_secret_output("environment_credential", credential);
        }
    }

    result
}
