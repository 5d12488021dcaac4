//! One collection of resources, as seen by the provisioner.

use async_trait::async_trait;
use std::sync::Arc;

use super::CloudManagerClient;
use crate::core::{EnvironmentSpec, Resource, StatusVocabulary};
use crate::errors::ClientError;

/// A named collection of remote resources with list/create/get/delete.
#[async_trait]
pub trait ResourceCollection: Send + Sync {
    /// Lists every resource in the collection.
    async fn list(&self) -> Result<Vec<Resource>, ClientError>;

    /// Requests creation. May or may not return the new resource.
    async fn create(&self, spec: &EnvironmentSpec) -> Result<Option<Resource>, ClientError>;

    /// Fetches one resource.
    async fn get(&self, id: &str) -> Result<Resource, ClientError>;

    /// Requests deletion.
    async fn delete(&self, id: &str) -> Result<(), ClientError>;

    /// The status vocabulary of this resource kind.
    fn vocabulary(&self) -> &StatusVocabulary;
}

/// The environments of one program.
#[derive(Clone)]
pub struct EnvironmentCollection {
    client: Arc<dyn CloudManagerClient>,
    program_id: String,
    vocabulary: StatusVocabulary,
}

impl std::fmt::Debug for EnvironmentCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentCollection")
            .field("program_id", &self.program_id)
            .finish_non_exhaustive()
    }
}

impl EnvironmentCollection {
    /// Creates a view over the environments of `program_id`.
    #[must_use]
    pub fn new(client: Arc<dyn CloudManagerClient>, program_id: impl Into<String>) -> Self {
        Self {
            client,
            program_id: program_id.into(),
            vocabulary: StatusVocabulary::environment(),
        }
    }

    /// The owning program.
    #[must_use]
    pub fn program_id(&self) -> &str {
        &self.program_id
    }
}

#[async_trait]
impl ResourceCollection for EnvironmentCollection {
    async fn list(&self) -> Result<Vec<Resource>, ClientError> {
        self.client.list_environments(&self.program_id).await
    }

    async fn create(&self, spec: &EnvironmentSpec) -> Result<Option<Resource>, ClientError> {
        self.client.create_environment(&self.program_id, spec).await
    }

    async fn get(&self, id: &str) -> Result<Resource, ClientError> {
        self.client.get_environment(&self.program_id, id).await
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.client.delete_environment(&self.program_id, id).await
    }

    fn vocabulary(&self) -> &StatusVocabulary {
        &self.vocabulary
    }
}
