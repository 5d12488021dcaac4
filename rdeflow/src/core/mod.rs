//! Core domain model types for rdeflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Resource, execution and quality-gate snapshots
//! - Status classification vocabularies
//! - Poll, provision and orchestration results

mod outcome;
mod report;
mod resource;
mod status;

pub use outcome::{OperationKind, OrchestrationResult, PollOutcome, ProvisionResult};
pub use report::{QualityGateReport, REPORT_HEADERS};
pub use resource::{
    EnvironmentSpec, Execution, Link, Program, QualityGateMetric, QualityGateResults, Resource,
    StepState,
};
pub use status::{
    StatusClass, StatusVocabulary, ENVIRONMENT_STATUS_BROKEN, ENVIRONMENT_STATUS_CREATING,
    ENVIRONMENT_STATUS_DELETING, ENVIRONMENT_STATUS_READY, EXECUTION_STATUS_ACTIVE,
    EXECUTION_STATUS_FAILED, EXECUTION_STATUS_FINISHED,
};
