//! Wiring of one action run: credentials, client, orchestrator and sink.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::client::{HttpCloudManagerClient, ImsHeaders, TokenProvider, IMS_CONTEXT};
use crate::config::ActionConfig;
use crate::core::OrchestrationResult;
use crate::errors::{RdeflowError, Result};
use crate::orchestrator::{LifecycleOrchestrator, Operation};
use crate::output::{emit_result, OutputSink};

/// Runs the configured operation against the live API.
///
/// Any failure is reported through `sink` before it is returned.
pub async fn run(
    config: &ActionConfig,
    tokens: &dyn TokenProvider,
    sink: &dyn OutputSink,
) -> Result<OrchestrationResult> {
    let orchestrator = match connect(config, tokens).await {
        Ok(client) => {
            LifecycleOrchestrator::new(Arc::new(client)).with_settings(config.settings.clone())
        }
        Err(e) => return Err(report_failure(sink, e)),
    };
    execute(&orchestrator, &config.operation, sink).await
}

/// Runs `operation` and publishes its outputs.
pub async fn execute(
    orchestrator: &LifecycleOrchestrator,
    operation: &Operation,
    sink: &dyn OutputSink,
) -> Result<OrchestrationResult> {
    let result = match orchestrator.execute(operation).await {
        Ok(result) => result,
        Err(e) => return Err(report_failure(sink, e)),
    };
    if let Err(e) = emit_result(&result, sink) {
        return Err(report_failure(sink, e));
    }
    Ok(result)
}

async fn connect(config: &ActionConfig, tokens: &dyn TokenProvider) -> Result<HttpCloudManagerClient> {
    let access_token = tokens.get_token(IMS_CONTEXT).await?;
    info!(base_url = %config.base_url, ims_org_id = %config.ims_org_id, "Initialized Cloud Manager client");
    Ok(HttpCloudManagerClient::new(
        config.base_url.clone(),
        ImsHeaders {
            api_key: config.client_id.clone(),
            ims_org_id: config.ims_org_id.clone(),
            access_token,
        },
    )?)
}

fn report_failure(sink: &dyn OutputSink, e: RdeflowError) -> RdeflowError {
    error!(error = %e, "Action failed");
    if let Some(report) = e.report() {
        if let Err(summary_error) = sink.write_summary(report) {
            warn!(error = %summary_error, "Could not write quality gate summary");
        }
    }
    sink.set_failed(&e.to_string());
    e
}
