//! Scripted in-memory Cloud Manager.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::client::{CloudManagerClient, EnvironmentCollection};
use crate::core::{
    EnvironmentSpec, Execution, Program, QualityGateResults, Resource,
};
use crate::errors::ClientError;

#[derive(Debug, Default)]
struct FakeState {
    programs: Vec<Program>,
    environments: Vec<Resource>,
    status_scripts: HashMap<String, VecDeque<String>>,
    get_errors: VecDeque<ClientError>,
    created_ids: HashSet<String>,
    next_id: u32,
    hide_created_lists: u32,
    hidden_lists_left: u32,
    empty_create_response: bool,
    credential: Option<String>,
    delete_error: Option<ClientError>,
    deleted_ids: Vec<String>,
    execution: Option<Execution>,
    execution_script: VecDeque<String>,
    quality_gate: QualityGateResults,
    list_calls: u32,
    create_calls: u32,
    get_calls: u32,
}

/// An in-memory [`CloudManagerClient`] driven by scripted statuses.
///
/// Created environments get ids `env-1`, `env-2`, ... and start out
/// `creating`. Every `get_environment` call pops the next scripted status
/// for that id; once the script is empty the status stays where it is.
#[derive(Debug, Clone, Default)]
pub struct FakeCloudManager {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCloudManager {
    /// Creates an empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment collection of `program_id` backed by this fake.
    #[must_use]
    pub fn environments(&self, program_id: &str) -> EnvironmentCollection {
        EnvironmentCollection::new(Arc::new(self.clone()), program_id)
    }

    /// Adds an existing environment.
    pub fn insert(&self, resource: Resource) {
        self.state.lock().environments.push(resource);
    }

    /// Adds a program.
    pub fn insert_program(&self, id: &str, name: &str) {
        self.state.lock().programs.push(Program {
            id: id.to_string(),
            name: Some(name.to_string()),
        });
    }

    /// Statuses returned by successive `get_environment(id)` calls.
    pub fn script_statuses(&self, id: &str, statuses: &[&str]) {
        self.state.lock().status_scripts.insert(
            id.to_string(),
            statuses.iter().map(|s| (*s).to_string()).collect(),
        );
    }

    /// Errors returned by the next `get_environment` calls, before any
    /// scripted status.
    pub fn fail_next_gets(&self, errors: Vec<ClientError>) {
        self.state.lock().get_errors.extend(errors);
    }

    /// Leaves freshly created environments out of the next `count` lists.
    pub fn hide_created_for_lists(&self, count: u32) {
        self.state.lock().hide_created_lists = count;
    }

    /// Makes `create_environment` answer with an empty body.
    pub fn return_empty_create_response(&self) {
        self.state.lock().empty_create_response = true;
    }

    /// Makes `create_environment` hand out a credential.
    pub fn issue_credential(&self, credential: &str) {
        self.state.lock().credential = Some(credential.to_string());
    }

    /// Makes `delete_environment` fail with `error`.
    pub fn fail_deletes(&self, error: ClientError) {
        self.state.lock().delete_error = Some(error);
    }

    /// Statuses returned by successive `get_execution` calls.
    pub fn script_execution(&self, statuses: &[&str]) {
        self.state.lock().execution_script = statuses.iter().map(|s| (*s).to_string()).collect();
    }

    /// Results returned by `get_quality_gate_results`.
    pub fn set_quality_gate(&self, results: QualityGateResults) {
        self.state.lock().quality_gate = results;
    }

    /// Snapshot of an environment by id.
    #[must_use]
    pub fn environment(&self, id: &str) -> Option<Resource> {
        self.state.lock().environments.iter().find(|r| r.id == id).cloned()
    }

    /// Ids passed to `delete_environment`.
    #[must_use]
    pub fn deleted_ids(&self) -> Vec<String> {
        self.state.lock().deleted_ids.clone()
    }

    /// Number of `list_environments` calls.
    #[must_use]
    pub fn list_calls(&self) -> u32 {
        self.state.lock().list_calls
    }

    /// Number of `create_environment` calls.
    #[must_use]
    pub fn create_calls(&self) -> u32 {
        self.state.lock().create_calls
    }

    /// Number of `get_environment` calls.
    #[must_use]
    pub fn get_calls(&self) -> u32 {
        self.state.lock().get_calls
    }
}

fn not_found(what: &str) -> ClientError {
    ClientError::from_status(404, format!("{what} not found"))
}

#[async_trait]
impl CloudManagerClient for FakeCloudManager {
    async fn list_programs(&self) -> Result<Vec<Program>, ClientError> {
        Ok(self.state.lock().programs.clone())
    }

    async fn list_environments(&self, _program_id: &str) -> Result<Vec<Resource>, ClientError> {
        let mut state = self.state.lock();
        state.list_calls += 1;
        if state.hidden_lists_left > 0 {
            state.hidden_lists_left -= 1;
            let created = state.created_ids.clone();
            return Ok(state
                .environments
                .iter()
                .filter(|r| !created.contains(&r.id))
                .cloned()
                .collect());
        }
        Ok(state.environments.clone())
    }

    async fn create_environment(
        &self,
        program_id: &str,
        spec: &EnvironmentSpec,
    ) -> Result<Option<Resource>, ClientError> {
        let mut state = self.state.lock();
        state.create_calls += 1;
        state.next_id += 1;

        let id = format!("env-{}", state.next_id);
        let mut resource = Resource::new(&id, &spec.name, "creating")
            .with_kind(&spec.kind)
            .with_link(
                "http://ns.adobe.com/adobecloud/rel/author",
                format!("https://author-{id}.example.com"),
            );
        resource.description.clone_from(&spec.description);
        resource.program_id = Some(program_id.to_string());

        state.environments.push(resource.clone());
        state.created_ids.insert(id);
        state.hidden_lists_left = state.hide_created_lists;

        if state.empty_create_response {
            return Ok(None);
        }
        resource.credential.clone_from(&state.credential);
        Ok(Some(resource))
    }

    async fn get_environment(
        &self,
        _program_id: &str,
        environment_id: &str,
    ) -> Result<Resource, ClientError> {
        let mut state = self.state.lock();
        state.get_calls += 1;
        if let Some(error) = state.get_errors.pop_front() {
            return Err(error);
        }

        let next = state
            .status_scripts
            .get_mut(environment_id)
            .and_then(VecDeque::pop_front);
        let resource = state
            .environments
            .iter_mut()
            .find(|r| r.id == environment_id)
            .ok_or_else(|| not_found("environment"))?;
        if let Some(status) = next {
            resource.status = Some(status);
        }
        Ok(resource.clone())
    }

    async fn delete_environment(
        &self,
        _program_id: &str,
        environment_id: &str,
    ) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        if let Some(error) = state.delete_error.clone() {
            return Err(error);
        }
        let resource = state
            .environments
            .iter_mut()
            .find(|r| r.id == environment_id)
            .ok_or_else(|| not_found("environment"))?;
        resource.status = Some("deleting".to_string());
        state.deleted_ids.push(environment_id.to_string());
        Ok(())
    }

    async fn create_execution(
        &self,
        program_id: &str,
        pipeline_id: &str,
    ) -> Result<Execution, ClientError> {
        let mut execution = Execution::new("exec-1", "NOT_STARTED")
            .with_step("validate", "NOT_STARTED")
            .with_step("build", "NOT_STARTED")
            .with_step("codeQuality", "NOT_STARTED");
        execution.program_id = Some(program_id.to_string());
        execution.pipeline_id = Some(pipeline_id.to_string());
        self.state.lock().execution = Some(execution.clone());
        Ok(execution)
    }

    async fn get_execution(
        &self,
        _program_id: &str,
        _pipeline_id: &str,
        execution_id: &str,
    ) -> Result<Execution, ClientError> {
        let mut state = self.state.lock();
        let next = state.execution_script.pop_front();
        let execution = state
            .execution
            .as_mut()
            .filter(|e| e.id == execution_id)
            .ok_or_else(|| not_found("execution"))?;
        if let Some(status) = next {
            execution.status = Some(status);
        }
        Ok(execution.clone())
    }

    async fn get_quality_gate_results(
        &self,
        _program_id: &str,
        _pipeline_id: &str,
        _execution_id: &str,
        _action: &str,
    ) -> Result<QualityGateResults, ClientError> {
        Ok(self.state.lock().quality_gate.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_statuses_then_sticky() {
        let fake = FakeCloudManager::new();
        fake.insert(Resource::new("env-1", "pr-1", "creating"));
        fake.script_statuses("env-1", &["ready"]);

        let first = fake.get_environment("p", "env-1").await.unwrap();
        let second = fake.get_environment("p", "env-1").await.unwrap();

        assert_eq!(first.status.as_deref(), Some("ready"));
        assert_eq!(second.status.as_deref(), Some("ready"));
        assert_eq!(fake.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_environment_is_404() {
        let fake = FakeCloudManager::new();
        let err = fake.get_environment("p", "nope").await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
    }
}
