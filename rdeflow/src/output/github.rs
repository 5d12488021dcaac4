//! GitHub Actions workflow-command sink.

use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::sink::OutputSink;
use crate::core::QualityGateReport;
use crate::errors::Result;

/// Variable naming the file step outputs are appended to.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";
/// Variable naming the file the job summary is appended to.
pub const GITHUB_STEP_SUMMARY_ENV: &str = "GITHUB_STEP_SUMMARY";

const SUMMARY_HEADING: &str = "## Quality gates";

/// Writes outputs and summaries the way an Actions runner expects them.
///
/// Without an output or summary file the same content goes to the console.
pub struct GithubActionsSink {
    output_file: Option<PathBuf>,
    summary_file: Option<PathBuf>,
    console: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for GithubActionsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubActionsSink")
            .field("output_file", &self.output_file)
            .field("summary_file", &self.summary_file)
            .finish_non_exhaustive()
    }
}

impl GithubActionsSink {
    /// Creates a sink with explicit file locations, writing commands to stdout.
    #[must_use]
    pub fn new(output_file: Option<PathBuf>, summary_file: Option<PathBuf>) -> Self {
        Self {
            output_file,
            summary_file,
            console: Mutex::new(Box::new(std::io::stdout())),
        }
    }

    /// Creates a sink from the runner's environment.
    #[must_use]
    pub fn from_env() -> Self {
        let path = |var: &str| {
            std::env::var_os(var)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self::new(path(GITHUB_OUTPUT_ENV), path(GITHUB_STEP_SUMMARY_ENV))
    }

    /// Sends workflow commands to `console` instead of stdout.
    #[must_use]
    pub fn with_console(mut self, console: Box<dyn Write + Send>) -> Self {
        self.console = Mutex::new(console);
        self
    }

    fn console_line(&self, line: &str) {
        let mut console = self.console.lock();
        if let Err(e) = writeln!(console, "{line}") {
            tracing::warn!(error = %e, "Could not write workflow command");
        }
    }
}

fn append(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Renders `key`/`value` in the output-file format, using a heredoc when
/// the value spans lines.
fn output_entry(key: &str, value: &str) -> String {
    if value.contains('\n') || value.contains('\r') {
        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        format!("{key}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{key}={value}\n")
    }
}

/// Escapes a workflow-command message.
fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

impl OutputSink for GithubActionsSink {
    fn set_output(&self, key: &str, value: &str) -> Result<()> {
        let entry = output_entry(key, value);
        match &self.output_file {
            Some(path) => append(path, &entry),
            None => {
                self.console_line(entry.trim_end_matches('\n'));
                Ok(())
            }
        }
    }

    fn mask(&self, value: &str) {
        for line in value.lines().map(str::trim).filter(|l| !l.is_empty()) {
            self.console_line(&format!("::add-mask::{}", escape_data(line)));
        }
    }

    fn write_summary(&self, report: &QualityGateReport) -> Result<()> {
        let content = format!("{SUMMARY_HEADING}\n\n{}\n", report.to_markdown());
        match &self.summary_file {
            Some(path) => append(path, &content),
            None => {
                self.console_line(content.trim_end());
                Ok(())
            }
        }
    }

    fn set_failed(&self, message: &str) {
        self.console_line(&format!("::error::{}", escape_data(message)));
    }
}
