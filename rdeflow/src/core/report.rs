//! Tabular quality-gate report.

use serde::{Deserialize, Serialize};

use super::QualityGateMetric;

/// Column headers of the quality-gate table.
pub const REPORT_HEADERS: [&str; 5] = ["KPI", "Severity", "Passed", "Expected Value", "Actual Value"];

/// A quality-gate table ready to be written to a run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityGateReport {
    /// One row per metric, in the column order of [`REPORT_HEADERS`].
    pub rows: Vec<[String; 5]>,
}

impl QualityGateReport {
    /// Builds a report from quality-gate metrics.
    #[must_use]
    pub fn from_metrics(metrics: &[QualityGateMetric]) -> Self {
        let rows = metrics
            .iter()
            .map(|metric| {
                [
                    metric.kpi.clone(),
                    metric.severity.clone(),
                    if metric.passed { "yes" } else { "no" }.to_string(),
                    metric.expected_value.clone(),
                    metric.actual_value.clone(),
                ]
            })
            .collect();
        Self { rows }
    }

    /// Number of failed gates.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.rows.iter().filter(|row| row[2] == "no").count()
    }

    /// Returns true if the report has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the report as a markdown table.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("| {} |\n", REPORT_HEADERS.join(" | ")));
        out.push_str(&format!("|{}\n", " --- |".repeat(REPORT_HEADERS.len())));
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|cell| escape_cell(cell)).collect();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        out
    }
}

/// Makes `cell` safe inside one markdown table cell.
fn escape_cell(cell: &str) -> String {
    cell.replace("\r\n", "\n")
        .replace(['\r', '\n'], "<br>")
        .replace('|', "\\|")
}
