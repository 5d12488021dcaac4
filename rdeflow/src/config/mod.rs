//! Command-line and action-input configuration.
//!
//! Every flag can also be supplied through the `INPUT_<NAME>` environment
//! variable a GitHub Actions runner sets for a `with:` input, so the same
//! binary works both as an action step and from a shell.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::core::EnvironmentSpec;
use crate::errors::{RdeflowError, Result};
use crate::orchestrator::{Operation, OrchestratorSettings};
use crate::poller::{BackoffStrategy, JitterStrategy, PollConfig, RetryConfig};

/// Action to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Create an environment, or adopt the existing one.
    Create,
    /// Delete an environment by name.
    Delete,
    /// Start a pipeline and wait for it.
    RunPipeline,
    /// List visible programs.
    ListPrograms,
}

/// Growth of the pause between retries of a status read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backoff {
    /// base * 2^retry
    Exponential,
    /// base * (retry + 1)
    Linear,
    /// base
    Constant,
}

impl From<Backoff> for BackoffStrategy {
    fn from(backoff: Backoff) -> Self {
        match backoff {
            Backoff::Exponential => Self::Exponential,
            Backoff::Linear => Self::Linear,
            Backoff::Constant => Self::Constant,
        }
    }
}

/// Randomization of the retry pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Jitter {
    /// Exact pause.
    None,
    /// Anywhere between zero and the pause.
    Full,
    /// Half fixed, half random.
    Equal,
}

impl From<Jitter> for JitterStrategy {
    fn from(jitter: Jitter) -> Self {
        match jitter {
            Jitter::None => Self::None,
            Jitter::Full => Self::Full,
            Jitter::Equal => Self::Equal,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// rdeflow - Cloud Manager rapid development environments from CI
#[derive(Parser, Debug, Clone)]
#[command(name = "rdeflow", version)]
pub struct Cli {
    /// Action to run
    #[arg(long, value_enum, env = "INPUT_ACTION")]
    pub action: Action,

    /// Cloud Manager program id
    #[arg(long, env = "INPUT_PROGRAMID")]
    pub program_id: Option<String>,

    /// Environment name (create, delete)
    #[arg(long, env = "INPUT_ENVIRONMENTNAME")]
    pub environment_name: Option<String>,

    /// Environment type (create)
    #[arg(long, env = "INPUT_ENVIRONMENTTYPE", default_value = "rde")]
    pub environment_type: String,

    /// Environment description (create)
    #[arg(long, env = "INPUT_ENVIRONMENTDESCRIPTION")]
    pub environment_description: Option<String>,

    /// Pipeline id (run-pipeline)
    #[arg(long, env = "INPUT_PIPELINEID")]
    pub pipeline_id: Option<String>,

    /// Cloud Manager API base URL
    #[arg(long, env = "INPUT_BASEURL")]
    pub base_url: Option<String>,

    /// Credential configuration as JSON; supplies client id and org id
    #[arg(long, env = "INPUT_IMSCONFIG")]
    pub ims_config: Option<String>,

    /// Client id (`x-api-key`), used when no IMS config is given
    #[arg(long, env = "INPUT_CLIENTID")]
    pub client_id: Option<String>,

    /// Organization id, used when no IMS config is given
    #[arg(long, env = "INPUT_IMSORGID")]
    pub ims_org_id: Option<String>,

    /// Bearer token
    #[arg(long, env = "INPUT_ACCESSTOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Seconds between environment status checks
    #[arg(long, env = "INPUT_POLLINTERVAL")]
    pub poll_interval: Option<u64>,

    /// Seconds to wait for an environment to become ready
    #[arg(long, env = "INPUT_MAXWAIT")]
    pub max_wait: Option<u64>,

    /// Seconds between pipeline execution status checks
    #[arg(long, env = "INPUT_EXECUTIONPOLLINTERVAL")]
    pub execution_poll_interval: Option<u64>,

    /// Seconds to wait for a pipeline execution to finish
    #[arg(long, env = "INPUT_EXECUTIONMAXWAIT")]
    pub execution_max_wait: Option<u64>,

    /// Calls per status read before a transient error ends the attempt
    #[arg(long, env = "INPUT_RETRYATTEMPTS")]
    pub retry_attempts: Option<u32>,

    /// Base pause between status-read retries, in milliseconds
    #[arg(long, env = "INPUT_RETRYBASEDELAYMS")]
    pub retry_base_delay_ms: Option<u64>,

    /// Upper bound of the pause between status-read retries, in milliseconds
    #[arg(long, env = "INPUT_RETRYMAXDELAYMS")]
    pub retry_max_delay_ms: Option<u64>,

    /// Backoff between status-read retries
    #[arg(long, value_enum, env = "INPUT_RETRYBACKOFF")]
    pub retry_backoff: Option<Backoff>,

    /// Jitter applied to the retry pause
    #[arg(long, value_enum, env = "INPUT_RETRYJITTER")]
    pub retry_jitter: Option<Jitter>,

    /// List calls made while waiting for a created environment to show up
    #[arg(long, env = "INPUT_RELISTATTEMPTS")]
    pub relist_attempts: Option<u32>,

    /// Log format
    #[arg(long, value_enum, env = "RDEFLOW_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Fields read from the `ims_config` input.
#[derive(Debug, Clone, Deserialize)]
struct ImsConfig {
    client_id: Option<String>,
    ims_org_id: Option<String>,
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct ActionConfig {
    /// What to do.
    pub operation: Operation,
    /// API base URL, always ending in `/`.
    pub base_url: Url,
    /// Client id sent as `x-api-key`.
    pub client_id: String,
    /// Organization id.
    pub ims_org_id: String,
    /// Bearer token, if supplied.
    pub access_token: Option<String>,
    /// Poll and re-list tunables.
    pub settings: OrchestratorSettings,
}

impl ActionConfig {
    /// Validates `cli` and resolves it into a run configuration.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let operation = operation(cli)?;

        let base_url = parse_base_url(&required(cli.base_url.as_deref(), "baseUrl")?)?;

        let (client_id, ims_org_id) = match non_empty(cli.ims_config.as_deref()) {
            Some(raw) => {
                let ims: ImsConfig = serde_json::from_str(raw).map_err(|e| {
                    RdeflowError::configuration(format!("imsConfig is not valid JSON: {e}"))
                })?;
                (
                    required(ims.client_id.as_deref(), "imsConfig.client_id")?,
                    required(ims.ims_org_id.as_deref(), "imsConfig.ims_org_id")?,
                )
            }
            None => (
                required(cli.client_id.as_deref(), "clientId")?,
                required(cli.ims_org_id.as_deref(), "imsOrgId")?,
            ),
        };

        Ok(Self {
            operation,
            base_url,
            client_id,
            ims_org_id,
            access_token: non_empty(cli.access_token.as_deref()).map(str::to_string),
            settings: settings(cli)?,
        })
    }
}

fn operation(cli: &Cli) -> Result<Operation> {
    Ok(match cli.action {
        Action::Create => {
            let mut spec = EnvironmentSpec::new(required(
                cli.environment_name.as_deref(),
                "environmentName",
            )?)
            .with_kind(cli.environment_type.trim());
            if let Some(description) = non_empty(cli.environment_description.as_deref()) {
                spec = spec.with_description(description);
            }
            Operation::Create {
                program_id: required(cli.program_id.as_deref(), "programId")?,
                spec,
            }
        }
        Action::Delete => Operation::Delete {
            program_id: required(cli.program_id.as_deref(), "programId")?,
            name: required(cli.environment_name.as_deref(), "environmentName")?,
        },
        Action::RunPipeline => Operation::RunPipeline {
            program_id: required(cli.program_id.as_deref(), "programId")?,
            pipeline_id: required(cli.pipeline_id.as_deref(), "pipelineId")?,
        },
        Action::ListPrograms => Operation::ListPrograms,
    })
}

fn settings(cli: &Cli) -> Result<OrchestratorSettings> {
    let defaults = OrchestratorSettings::default();
    let mut environment_poll = poll_config(
        &defaults.environment_poll,
        cli.poll_interval,
        cli.max_wait,
        "pollInterval",
    )?;
    let mut execution_poll = poll_config(
        &defaults.execution_poll,
        cli.execution_poll_interval,
        cli.execution_max_wait,
        "executionPollInterval",
    )?;

    environment_poll.retry = retry_config(cli, environment_poll.retry);
    execution_poll.retry = retry_config(cli, execution_poll.retry);

    let mut relist = defaults.relist;
    if let Some(attempts) = cli.relist_attempts {
        relist.attempts = attempts.max(1);
    }

    Ok(OrchestratorSettings {
        environment_poll,
        execution_poll,
        relist,
        ..defaults
    })
}

fn retry_config(cli: &Cli, mut retry: RetryConfig) -> RetryConfig {
    if let Some(attempts) = cli.retry_attempts {
        retry = retry.with_max_attempts(attempts);
    }
    if let Some(delay) = cli.retry_base_delay_ms {
        retry = retry.with_base_delay_ms(delay);
    }
    if let Some(delay) = cli.retry_max_delay_ms {
        retry = retry.with_max_delay_ms(delay);
    }
    if let Some(backoff) = cli.retry_backoff {
        retry = retry.with_backoff(backoff.into());
    }
    if let Some(jitter) = cli.retry_jitter {
        retry = retry.with_jitter(jitter.into());
    }
    retry
}

fn poll_config(
    defaults: &PollConfig,
    interval: Option<u64>,
    max_wait: Option<u64>,
    input: &str,
) -> Result<PollConfig> {
    if interval == Some(0) {
        return Err(RdeflowError::configuration(format!(
            "{input} must be greater than zero"
        )));
    }
    let mut config = defaults.clone();
    if let Some(secs) = interval {
        config.interval = Duration::from_secs(secs);
    }
    if let Some(secs) = max_wait {
        config.max_wait = Duration::from_secs(secs);
    }
    Ok(config)
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)
        .map_err(|e| RdeflowError::configuration(format!("baseUrl '{raw}' is invalid: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(RdeflowError::configuration(format!(
            "baseUrl '{raw}' cannot be used as a base"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required(value: Option<&str>, input: &str) -> Result<String> {
    non_empty(value)
        .map(str::to_string)
        .ok_or_else(|| RdeflowError::configuration(format!("Input required and not supplied: {input}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["rdeflow"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    const AUTH: [&str; 6] = [
        "--base-url",
        "https://cloudmanager.example.com/v1",
        "--client-id",
        "client",
        "--ims-org-id",
        "org@AdobeOrg",
    ];

    fn with_auth(args: &[&str]) -> Cli {
        let mut all: Vec<&str> = args.to_vec();
        all.extend_from_slice(&AUTH);
        cli(&all)
    }

    #[test]
    fn test_create_operation() {
        let config = ActionConfig::from_cli(&with_auth(&[
            "--action",
            "create",
            "--program-id",
            "p1",
            "--environment-name",
            "pr-1",
            "--environment-description",
            "Preview",
        ]))
        .unwrap();

        assert_eq!(
            config.operation,
            Operation::Create {
                program_id: "p1".into(),
                spec: EnvironmentSpec::new("pr-1").with_description("Preview"),
            }
        );
        assert_eq!(config.client_id, "client");
        assert_eq!(config.ims_org_id, "org@AdobeOrg");
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_missing_required_input_is_configuration_error() {
        let err = ActionConfig::from_cli(&with_auth(&["--action", "run-pipeline", "--program-id", "p1"]))
            .unwrap_err();

        assert!(matches!(err, RdeflowError::Configuration(ref m) if m.contains("pipelineId")));
    }

    #[test]
    fn test_blank_input_counts_as_missing() {
        let err = ActionConfig::from_cli(&with_auth(&[
            "--action",
            "delete",
            "--program-id",
            "p1",
            "--environment-name",
            "  ",
        ]))
        .unwrap_err();

        assert!(matches!(err, RdeflowError::Configuration(ref m) if m.contains("environmentName")));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ActionConfig::from_cli(&with_auth(&["--action", "list-programs"])).unwrap();
        assert_eq!(config.base_url.as_str(), "https://cloudmanager.example.com/v1/");
        assert_eq!(config.operation, Operation::ListPrograms);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = ActionConfig::from_cli(&cli(&[
            "--action",
            "list-programs",
            "--base-url",
            "not a url",
            "--client-id",
            "c",
            "--ims-org-id",
            "o",
        ]))
        .unwrap_err();
        assert!(matches!(err, RdeflowError::Configuration(_)));
    }

    #[test]
    fn test_ims_config_supplies_identity() {
        let config = ActionConfig::from_cli(&cli(&[
            "--action",
            "list-programs",
            "--base-url",
            "https://cloudmanager.example.com",
            "--ims-config",
            r#"{"client_id":"from-json","ims_org_id":"org-json","client_secret":"x"}"#,
            "--client-id",
            "ignored",
        ]))
        .unwrap();

        assert_eq!(config.client_id, "from-json");
        assert_eq!(config.ims_org_id, "org-json");
    }

    #[test]
    fn test_malformed_ims_config() {
        let err = ActionConfig::from_cli(&cli(&[
            "--action",
            "list-programs",
            "--base-url",
            "https://cloudmanager.example.com",
            "--ims-config",
            "{not json",
        ]))
        .unwrap_err();
        assert!(matches!(err, RdeflowError::Configuration(ref m) if m.contains("imsConfig")));
    }

    #[test]
    fn test_poll_overrides() {
        let config = ActionConfig::from_cli(&with_auth(&[
            "--action",
            "list-programs",
            "--poll-interval",
            "5",
            "--max-wait",
            "60",
        ]))
        .unwrap();

        assert_eq!(config.settings.environment_poll.interval, Duration::from_secs(5));
        assert_eq!(config.settings.environment_poll.max_attempts(), 12);
        assert_eq!(config.settings.execution_poll, PollConfig::execution());
    }

    #[test]
    fn test_retry_and_relist_overrides() {
        let config = ActionConfig::from_cli(&with_auth(&[
            "--action",
            "list-programs",
            "--retry-attempts",
            "0",
            "--relist-attempts",
            "8",
        ]))
        .unwrap();

        assert_eq!(config.settings.environment_poll.retry.max_attempts, 1);
        assert_eq!(config.settings.execution_poll.retry.max_attempts, 1);
        assert_eq!(config.settings.relist.attempts, 8);
    }

    #[test]
    fn test_retry_backoff_overrides() {
        let config = ActionConfig::from_cli(&with_auth(&[
            "--action",
            "list-programs",
            "--retry-base-delay-ms",
            "250",
            "--retry-max-delay-ms",
            "2000",
            "--retry-backoff",
            "linear",
            "--retry-jitter",
            "equal",
        ]))
        .unwrap();

        let expected = RetryConfig::new()
            .with_base_delay_ms(250)
            .with_max_delay_ms(2000)
            .with_backoff(BackoffStrategy::Linear)
            .with_jitter(JitterStrategy::Equal);
        assert_eq!(config.settings.environment_poll.retry, expected);
        assert_eq!(config.settings.execution_poll.retry, expected);
    }

    #[test]
    fn test_retry_defaults_without_overrides() {
        let config = ActionConfig::from_cli(&with_auth(&["--action", "list-programs"])).unwrap();
        assert_eq!(config.settings.environment_poll.retry, RetryConfig::default());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err = ActionConfig::from_cli(&with_auth(&[
            "--action",
            "list-programs",
            "--execution-poll-interval",
            "0",
        ]))
        .unwrap_err();
        assert!(matches!(err, RdeflowError::Configuration(_)));
    }
}
