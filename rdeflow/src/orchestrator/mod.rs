//! Lifecycle orchestration.
//!
//! This module provides:
//! - The [`Operation`] enum describing one run
//! - The [`LifecycleOrchestrator`] that sequences provisioning, teardown and
//!   pipeline monitoring into an [`OrchestrationResult`](crate::core::OrchestrationResult)

mod lifecycle;

pub use lifecycle::{
    link_output_key, LifecycleOrchestrator, Operation, OrchestratorSettings, QUALITY_GATE_ACTION,
};
