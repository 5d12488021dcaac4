//! Step outputs, secret masking and run summaries.
//!
//! This module provides:
//! - The [`OutputSink`] trait the binary reports through
//! - [`GithubActionsSink`] writing the runner's output and summary files
//! - [`RecordingSink`] keeping everything in memory
//! - [`emit_result`] mapping an orchestration result onto a sink

mod github;
mod sink;

pub use github::{GithubActionsSink, GITHUB_OUTPUT_ENV, GITHUB_STEP_SUMMARY_ENV};
pub use sink::{emit_result, OutputSink, RecordingSink};

#[cfg(test)]
pub use sink::MockOutputSink;
