//! The output sink seam.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::{OrchestrationResult, QualityGateReport};
use crate::errors::Result;

/// Destination for step outputs, masks, summaries and the failure message.
#[cfg_attr(test, mockall::automock)]
pub trait OutputSink: Send + Sync {
    /// Publishes a named step output.
    fn set_output(&self, key: &str, value: &str) -> Result<()>;

    /// Registers a value that must never appear in logs.
    fn mask(&self, value: &str);

    /// Appends the quality-gate table to the run summary.
    fn write_summary(&self, report: &QualityGateReport) -> Result<()>;

    /// Marks the step as failed with `message`.
    fn set_failed(&self, message: &str);
}

/// Publishes `result` to `sink`.
///
/// Secret values are masked before any output is written.
pub fn emit_result(result: &OrchestrationResult, sink: &dyn OutputSink) -> Result<()> {
    for key in &result.secret_outputs {
        if let Some(value) = result.output(key) {
            sink.mask(value);
        }
    }

    for (key, value) in &result.outputs {
        sink.set_output(key, value)?;
    }

    if let Some(report) = &result.report {
        sink.write_summary(report)?;
    }

    debug!(
        operation = %result.operation,
        outputs = result.outputs.len(),
        "Emitted step outputs"
    );
    Ok(())
}

#[derive(Debug, Default)]
struct Recorded {
    outputs: BTreeMap<String, String>,
    masked: Vec<String>,
    summaries: Vec<String>,
    failures: Vec<String>,
}

/// An [`OutputSink`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    recorded: Mutex<Recorded>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Outputs set so far.
    #[must_use]
    pub fn outputs(&self) -> BTreeMap<String, String> {
        self.recorded.lock().outputs.clone()
    }

    /// Masked values in registration order.
    #[must_use]
    pub fn masked(&self) -> Vec<String> {
        self.recorded.lock().masked.clone()
    }

    /// Rendered summaries.
    #[must_use]
    pub fn summaries(&self) -> Vec<String> {
        self.recorded.lock().summaries.clone()
    }

    /// Failure messages.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.recorded.lock().failures.clone()
    }
}

impl OutputSink for RecordingSink {
    fn set_output(&self, key: &str, value: &str) -> Result<()> {
        self.recorded
            .lock()
            .outputs
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn mask(&self, value: &str) {
        self.recorded.lock().masked.push(value.to_string());
    }

    fn write_summary(&self, report: &QualityGateReport) -> Result<()> {
        self.recorded.lock().summaries.push(report.to_markdown());
        Ok(())
    }

    fn set_failed(&self, message: &str) {
        self.recorded.lock().failures.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OperationKind, QualityGateMetric};
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn report() -> QualityGateReport {
        QualityGateReport::from_metrics(&[QualityGateMetric {
            kpi: "coverage".into(),
            severity: "important".into(),
            passed: true,
            expected_value: "50".into(),
            actual_value: "80".into(),
        }])
    }

    #[test]
    fn test_secrets_are_masked_before_outputs() {
        let result = OrchestrationResult::new(OperationKind::Create)
            .with_output("environment_id", "env-1")
            .with_secret_output("environment_credential", "s3cret");

        let mut sink = MockOutputSink::new();
        let mut seq = Sequence::new();
        sink.expect_mask()
            .with(eq("s3cret"))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        sink.expect_set_output()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        sink.expect_write_summary().never();

        emit_result(&result, &sink).unwrap();
    }

    #[test]
    fn test_report_is_written_to_summary() {
        let result = OrchestrationResult::new(OperationKind::RunPipeline)
            .with_output("execution_id", "exec-1")
            .with_report(report());

        let mut sink = MockOutputSink::new();
        sink.expect_mask().never();
        sink.expect_set_output()
            .with(eq("execution_id"), eq("exec-1"))
            .times(1)
            .returning(|_, _| Ok(()));
        sink.expect_write_summary()
            .withf(|r| r.rows.len() == 1)
            .times(1)
            .returning(|_| Ok(()));

        emit_result(&result, &sink).unwrap();
    }

    #[test]
    fn test_output_error_stops_emission() {
        let result = OrchestrationResult::new(OperationKind::Create)
            .with_output("a", "1")
            .with_output("b", "2");

        let mut sink = MockOutputSink::new();
        sink.expect_set_output().times(1).returning(|_, _| {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        });

        assert!(emit_result(&result, &sink).is_err());
    }

    #[test]
    fn test_recording_sink() {
        let result = OrchestrationResult::new(OperationKind::RunPipeline)
            .with_output("execution_status", "FINISHED")
            .with_report(report());
        let sink = RecordingSink::new();

        emit_result(&result, &sink).unwrap();
        sink.set_failed("boom");

        assert_eq!(sink.outputs()["execution_status"], "FINISHED");
        assert!(sink.masked().is_empty());
        assert_eq!(sink.summaries().len(), 1);
        assert!(sink.summaries()[0].contains("| coverage | important | yes | 50 | 80 |"));
        assert_eq!(sink.failures(), vec!["boom".to_string()]);
    }
}
