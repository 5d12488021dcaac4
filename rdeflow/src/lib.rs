//! # Rdeflow
//!
//! CI automation for Cloud Manager rapid development environments (RDEs).
//!
//! Rdeflow drives environments through their lifecycle from a CI job:
//!
//! - **Readiness polling**: bounded wait-then-check loops with terminal
//!   status detection and retry of transient read failures
//! - **Idempotent provisioning**: create an environment or adopt the one a
//!   previous run left behind
//! - **Lifecycle orchestration**: create, delete and pipeline runs with
//!   step outputs and a quality-gate summary
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rdeflow::prelude::*;
//!
//! let client = HttpCloudManagerClient::new(base_url, headers)?;
//! let orchestrator = LifecycleOrchestrator::new(Arc::new(client));
//!
//! let result = orchestrator
//!     .execute(&Operation::Create {
//!         program_id: "12345".into(),
//!         spec: EnvironmentSpec::new("pr-42"),
//!     })
//!     .await?;
//! emit_result(&result, &GithubActionsSink::from_env())?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod app;
pub mod client;
pub mod config;
pub mod core;
pub mod errors;
pub mod orchestrator;
pub mod output;
pub mod poller;
pub mod provisioner;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::{
        CloudManagerClient, EnvironmentCollection, HttpCloudManagerClient, ImsHeaders,
        ResourceCollection, StaticTokenProvider, TokenProvider,
    };
    pub use crate::config::{ActionConfig, Cli};
    pub use crate::core::{
        EnvironmentSpec, OperationKind, OrchestrationResult, PollOutcome, ProvisionResult,
        QualityGateReport, Resource, StatusClass, StatusVocabulary,
    };
    pub use crate::errors::{ClientError, RdeflowError, Result};
    pub use crate::orchestrator::{LifecycleOrchestrator, Operation, OrchestratorSettings};
    pub use crate::output::{emit_result, GithubActionsSink, OutputSink, RecordingSink};
    pub use crate::poller::{PollConfig, PollObserver, ReadinessPoller, RetryConfig};
    pub use crate::provisioner::{IdempotentProvisioner, RelistConfig};
}
