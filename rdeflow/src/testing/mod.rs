//! Testing utilities for rdeflow.
//!
//! This module provides:
//! - A scripted in-memory Cloud Manager
//! - Assertions for orchestration results

mod assertions;
mod fake;

pub use assertions::{assert_has_output, assert_no_secrets, assert_output_eq, assert_secret_output};
pub use fake::FakeCloudManager;
