//! Seams to the Cloud Manager API.
//!
//! This module provides:
//! - The [`CloudManagerClient`] trait the orchestrator drives
//! - A [`ResourceCollection`] view of one program's environments
//! - Token providers
//! - A `reqwest` backed client

mod collection;
mod http;
mod token;

pub use collection::{EnvironmentCollection, ResourceCollection};
pub use http::{HttpCloudManagerClient, ImsHeaders};
pub use token::{StaticTokenProvider, TokenProvider, IMS_CONTEXT};

use async_trait::async_trait;

use crate::core::{EnvironmentSpec, Execution, Program, QualityGateResults, Resource};
use crate::errors::ClientError;

/// Capabilities required from the Cloud Manager API.
#[async_trait]
pub trait CloudManagerClient: Send + Sync {
    /// Lists the programs the credential can see.
    async fn list_programs(&self) -> Result<Vec<Program>, ClientError>;

    /// Lists the environments of a program.
    async fn list_environments(&self, program_id: &str) -> Result<Vec<Resource>, ClientError>;

    /// Requests creation of an environment.
    ///
    /// The API may answer with the new environment or with an empty body;
    /// callers must not rely on getting the resource back.
    async fn create_environment(
        &self,
        program_id: &str,
        spec: &EnvironmentSpec,
    ) -> Result<Option<Resource>, ClientError>;

    /// Fetches one environment.
    async fn get_environment(
        &self,
        program_id: &str,
        environment_id: &str,
    ) -> Result<Resource, ClientError>;

    /// Requests deletion of an environment.
    async fn delete_environment(
        &self,
        program_id: &str,
        environment_id: &str,
    ) -> Result<(), ClientError>;

    /// Starts a pipeline execution.
    async fn create_execution(
        &self,
        program_id: &str,
        pipeline_id: &str,
    ) -> Result<Execution, ClientError>;

    /// Fetches one pipeline execution.
    async fn get_execution(
        &self,
        program_id: &str,
        pipeline_id: &str,
        execution_id: &str,
    ) -> Result<Execution, ClientError>;

    /// Fetches the quality-gate metrics of the step running `action`.
    async fn get_quality_gate_results(
        &self,
        program_id: &str,
        pipeline_id: &str,
        execution_id: &str,
        action: &str,
    ) -> Result<QualityGateResults, ClientError>;
}
