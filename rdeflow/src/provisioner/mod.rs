//! Create-or-adopt provisioning.
//!
//! The provisioner looks a resource up by name before creating it, so a
//! rerun of the same CI job adopts the environment the previous run left
//! behind instead of failing on a name collision.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::client::ResourceCollection;
use crate::core::{EnvironmentSpec, PollOutcome, ProvisionResult, Resource, StatusClass};
use crate::errors::{lift_client_error, RdeflowError, Result};
use crate::poller::ReadinessPoller;

/// How often to re-list after a create call before giving up on seeing
/// the new resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelistConfig {
    /// Number of list calls, including the first one.
    pub attempts: u32,
    /// Pause between list calls.
    pub delay: Duration,
}

impl Default for RelistConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

/// Creates a resource or adopts an existing one with the same name.
pub struct IdempotentProvisioner<'a> {
    collection: &'a dyn ResourceCollection,
    poller: &'a ReadinessPoller,
    relist: RelistConfig,
}

impl<'a> IdempotentProvisioner<'a> {
    /// Creates a provisioner over `collection`.
    #[must_use]
    pub fn new(collection: &'a dyn ResourceCollection, poller: &'a ReadinessPoller) -> Self {
        Self {
            collection,
            poller,
            relist: RelistConfig::default(),
        }
    }

    /// Sets the re-list policy.
    #[must_use]
    pub fn with_relist(mut self, relist: RelistConfig) -> Self {
        self.relist = relist;
        self
    }

    /// Returns the first resource named `name`, if any.
    pub async fn find(&self, name: &str) -> Result<Option<Resource>> {
        let resources = self.collection.list().await.map_err(lift_client_error)?;
        Ok(resources.into_iter().find(|r| r.has_name(name)))
    }

    /// Ensures a resource matching `spec` exists and is ready.
    pub async fn provision(&self, spec: &EnvironmentSpec) -> Result<ProvisionResult> {
        let vocabulary = self.collection.vocabulary();

        if let Some(existing) = self.find(&spec.name).await? {
            let status = existing.status_str().to_string();
            info!(environment = %spec.name, id = %existing.id, status = %status, "Found existing resource");

            if vocabulary.is_deleting(&status) {
                return Err(RdeflowError::Conflict {
                    name: spec.name.clone(),
                    status,
                });
            }

            if vocabulary.is_creating(&status) {
                let (resource, outcome) = self.wait_until_ready(existing).await?;
                return Ok(ProvisionResult {
                    resource,
                    created: false,
                    outcome: Some(outcome),
                    credential: None,
                });
            }

            if vocabulary.classify(existing.status.as_deref()) == StatusClass::Failed {
                return Err(RdeflowError::resource_failed(status, 0));
            }

            return Ok(ProvisionResult {
                resource: existing,
                created: false,
                outcome: None,
                credential: None,
            });
        }

        info!(environment = %spec.name, kind = %spec.kind, "Creating resource");
        let response = self
            .collection
            .create(spec)
            .await
            .map_err(lift_client_error)?;
        let credential = response.as_ref().and_then(|r| r.credential.clone());

        let resource = match self.relist_after_create(&spec.name).await? {
            Some(resource) => resource,
            None => match response {
                Some(resource) if !resource.id.is_empty() => {
                    warn!(environment = %spec.name, id = %resource.id, "Created resource not listed yet, using creation response");
                    resource
                }
                _ => {
                    return Err(RdeflowError::NotFound(format!(
                        "'{}' was created but never appeared in the listing",
                        spec.name
                    )))
                }
            },
        };

        let (resource, outcome) = self.wait_until_ready(resource).await?;
        Ok(ProvisionResult {
            resource,
            created: true,
            outcome: Some(outcome),
            credential,
        })
    }

    /// Polls `resource` until it is ready, returning its latest snapshot.
    pub async fn wait_until_ready(&self, resource: Resource) -> Result<(Resource, PollOutcome)> {
        let label = format!("resource {}", resource.id);
        let id = resource.id.clone();
        let latest = Mutex::new(resource);

        let collection = self.collection;
        let id_ref = id.as_str();
        let latest_ref = &latest;
        let outcome = self
            .poller
            .poll(&label, collection.vocabulary(), move || async move {
                let snapshot = collection.get(id_ref).await?;
                let status = snapshot.status.clone();
                *latest_ref.lock() = snapshot;
                Ok(status)
            })
            .await?;

        Ok((latest.into_inner(), outcome))
    }

    async fn relist_after_create(&self, name: &str) -> Result<Option<Resource>> {
        let attempts = self.relist.attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(resource) = self.find(name).await? {
                return Ok(Some(resource));
            }
            if attempt < attempts {
                tracing::debug!(environment = name, attempt, "Created resource not listed yet");
                tokio::time::sleep(self.relist.delay).await;
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StatusVocabulary;
    use crate::poller::{NoOpPollObserver, PollConfig};
    use crate::testing::FakeCloudManager;
    use std::sync::Arc;

    fn poller() -> ReadinessPoller {
        ReadinessPoller::new(PollConfig::environment()).with_observer(Arc::new(NoOpPollObserver))
    }

    #[tokio::test(start_paused = true)]
    async fn test_creates_when_absent_and_waits_for_ready() {
        let fake = FakeCloudManager::new();
        fake.script_statuses("env-1", &["creating", "creating", "ready"]);
        let collection = fake.environments("p1");
        let poller = poller();

        let result = IdempotentProvisioner::new(&collection, &poller)
            .provision(&EnvironmentSpec::new("pr-1"))
            .await
            .unwrap();

        assert!(result.created);
        assert_eq!(result.resource.id, "env-1");
        assert_eq!(result.resource.status.as_deref(), Some("ready"));
        assert_eq!(result.outcome.unwrap().attempts, 3);
        assert_eq!(fake.create_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_provision_adopts_existing() {
        let fake = FakeCloudManager::new();
        fake.script_statuses("env-1", &["ready"]);
        let collection = fake.environments("p1");
        let poller = poller();
        let provisioner = IdempotentProvisioner::new(&collection, &poller);
        let spec = EnvironmentSpec::new("pr-1");

        let first = provisioner.provision(&spec).await.unwrap();
        let second = provisioner.provision(&spec).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.resource.id, second.resource.id);
        assert!(second.outcome.is_none());
        assert_eq!(fake.create_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_deleting_resource_is_conflict() {
        let fake = FakeCloudManager::new();
        fake.insert(Resource::new("env-9", "pr-1", "deleting"));
        let collection = fake.environments("p1");
        let poller = poller();

        let err = IdempotentProvisioner::new(&collection, &poller)
            .provision(&EnvironmentSpec::new("pr-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, RdeflowError::Conflict { ref status, .. } if status == "deleting"));
        assert_eq!(fake.create_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_creating_resource_is_awaited() {
        let fake = FakeCloudManager::new();
        fake.insert(Resource::new("env-3", "pr-1", "creating"));
        fake.script_statuses("env-3", &["creating", "ready"]);
        let collection = fake.environments("p1");
        let poller = poller();

        let result = IdempotentProvisioner::new(&collection, &poller)
            .provision(&EnvironmentSpec::new("pr-1"))
            .await
            .unwrap();

        assert!(!result.created);
        assert_eq!(result.outcome.unwrap().attempts, 2);
        assert_eq!(fake.create_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_names_pick_first_match() {
        let fake = FakeCloudManager::new();
        fake.insert(Resource::new("env-a", "pr-1", "ready"));
        fake.insert(Resource::new("env-b", "pr-1", "ready"));
        let collection = fake.environments("p1");
        let poller = poller();
        let provisioner = IdempotentProvisioner::new(&collection, &poller);

        for _ in 0..3 {
            let result = provisioner.provision(&EnvironmentSpec::new("pr-1")).await.unwrap();
            assert_eq!(result.resource.id, "env-a");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_failed_resource_is_reported() {
        let fake = FakeCloudManager::new();
        fake.insert(Resource::new("env-4", "pr-1", "restore_failed"));
        let collection = fake.environments("p1");
        let poller = poller();

        let err = IdempotentProvisioner::new(&collection, &poller)
            .provision(&EnvironmentSpec::new("pr-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, RdeflowError::ResourceFailed { attempts: 0, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_relist_tolerates_delayed_visibility() {
        let fake = FakeCloudManager::new();
        fake.hide_created_for_lists(2);
        fake.script_statuses("env-1", &["ready"]);
        let collection = fake.environments("p1");
        let poller = poller();

        let result = IdempotentProvisioner::new(&collection, &poller)
            .provision(&EnvironmentSpec::new("pr-1"))
            .await
            .unwrap();

        assert!(result.created);
        // initial lookup + two hidden re-lists + the one that finds it
        assert_eq!(fake.list_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_listed_without_creation_response_is_not_found() {
        let fake = FakeCloudManager::new();
        fake.hide_created_for_lists(100);
        fake.return_empty_create_response();
        let collection = fake.environments("p1");
        let poller = poller();

        let err = IdempotentProvisioner::new(&collection, &poller)
            .with_relist(RelistConfig {
                attempts: 3,
                delay: Duration::from_secs(1),
            })
            .provision(&EnvironmentSpec::new("pr-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, RdeflowError::NotFound(_)));
        assert_eq!(fake.list_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_only_on_fresh_creation() {
        let fake = FakeCloudManager::new();
        fake.issue_credential("initial-password");
        fake.script_statuses("env-1", &["ready"]);
        let collection = fake.environments("p1");
        let poller = poller();
        let provisioner = IdempotentProvisioner::new(&collection, &poller);
        let spec = EnvironmentSpec::new("pr-1");

        let first = provisioner.provision(&spec).await.unwrap();
        let second = provisioner.provision(&spec).await.unwrap();

        assert_eq!(first.credential.as_deref(), Some("initial-password"));
        assert!(second.credential.is_none());
    }

    #[test]
    fn test_environment_vocabulary_used_by_collection() {
        let fake = FakeCloudManager::new();
        let collection = fake.environments("p1");
        assert_eq!(collection.vocabulary(), &StatusVocabulary::environment());
    }
}
