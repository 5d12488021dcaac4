//! `reqwest` implementation of [`CloudManagerClient`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::CloudManagerClient;
use crate::core::{EnvironmentSpec, Execution, Program, QualityGateResults, Resource};
use crate::errors::ClientError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Identity headers sent with every request.
#[derive(Clone, Default)]
pub struct ImsHeaders {
    /// API key (`x-api-key`), the credential's client id.
    pub api_key: String,
    /// Organization id (`x-gw-ims-org-id`).
    pub ims_org_id: String,
    /// Bearer token.
    pub access_token: String,
}

impl std::fmt::Debug for ImsHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImsHeaders")
            .field("api_key", &self.api_key)
            .field("ims_org_id", &self.ims_org_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Cloud Manager API client over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpCloudManagerClient {
    base_url: Url,
    http: Client,
    headers: ImsHeaders,
}

impl HttpCloudManagerClient {
    /// Creates a client for `base_url`.
    pub fn new(base_url: Url, headers: ImsHeaders) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(concat!("rdeflow/", env!("CARGO_PKG_VERSION")))
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::InvalidResponse(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url,
            http,
            headers,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidResponse(format!("invalid request path '{path}': {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.headers.access_token)
            .header("x-api-key", &self.headers.api_key)
            .header("x-gw-ims-org-id", &self.headers.ims_org_id)
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, ClientError> {
        let response = self.authorize(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status, operation = what, "Cloud Manager request failed");
            return Err(ClientError::from_status(status, format!("{what}: {body}")));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, ClientError> {
        let url = self.url(path)?;
        let response = self.send(self.http.get(url), what).await?;
        Ok(response.json().await?)
    }
}

/// Unwraps a HAL collection body: `{"_embedded": {"<key>": [...]}}`.
pub(crate) fn embedded_list<T: DeserializeOwned>(
    body: serde_json::Value,
    key: &str,
) -> Result<Vec<T>, ClientError> {
    let items = body
        .get("_embedded")
        .and_then(|embedded| embedded.get(key))
        .cloned()
        .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
    serde_json::from_value(items)
        .map_err(|e| ClientError::InvalidResponse(format!("malformed '{key}' list: {e}")))
}

fn environments_path(program_id: &str) -> String {
    format!("api/program/{program_id}/environments")
}

fn environment_path(program_id: &str, environment_id: &str) -> String {
    format!("api/program/{program_id}/environment/{environment_id}")
}

fn execution_path(program_id: &str, pipeline_id: &str) -> String {
    format!("api/program/{program_id}/pipeline/{pipeline_id}/execution")
}

fn metrics_path(
    program_id: &str,
    pipeline_id: &str,
    execution_id: &str,
    phase_id: &str,
    step_id: &str,
) -> String {
    format!(
        "api/program/{program_id}/pipeline/{pipeline_id}/execution/{execution_id}/phase/{phase_id}/step/{step_id}/metrics"
    )
}

#[async_trait]
impl CloudManagerClient for HttpCloudManagerClient {
    async fn list_programs(&self) -> Result<Vec<Program>, ClientError> {
        let body: serde_json::Value = self.get_json("api/programs", "list programs").await?;
        embedded_list(body, "programs")
    }

    async fn list_environments(&self, program_id: &str) -> Result<Vec<Resource>, ClientError> {
        let body: serde_json::Value = self
            .get_json(&environments_path(program_id), "list environments")
            .await?;
        embedded_list(body, "environments")
    }

    async fn create_environment(
        &self,
        program_id: &str,
        spec: &EnvironmentSpec,
    ) -> Result<Option<Resource>, ClientError> {
        let url = self.url(&environments_path(program_id))?;
        let response = self
            .send(self.http.post(url).json(spec), "create environment")
            .await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ClientError::InvalidResponse(format!("create environment: {e}")))
    }

    async fn get_environment(
        &self,
        program_id: &str,
        environment_id: &str,
    ) -> Result<Resource, ClientError> {
        self.get_json(&environment_path(program_id, environment_id), "get environment")
            .await
    }

    async fn delete_environment(
        &self,
        program_id: &str,
        environment_id: &str,
    ) -> Result<(), ClientError> {
        let url = self.url(&environment_path(program_id, environment_id))?;
        self.send(self.http.delete(url), "delete environment").await?;
        Ok(())
    }

    async fn create_execution(
        &self,
        program_id: &str,
        pipeline_id: &str,
    ) -> Result<Execution, ClientError> {
        let url = self.url(&execution_path(program_id, pipeline_id))?;
        let response = self.send(self.http.put(url), "start execution").await?;
        Ok(response.json().await?)
    }

    async fn get_execution(
        &self,
        program_id: &str,
        pipeline_id: &str,
        execution_id: &str,
    ) -> Result<Execution, ClientError> {
        let path = format!("{}/{execution_id}", execution_path(program_id, pipeline_id));
        self.get_json(&path, "get execution").await
    }

    async fn get_quality_gate_results(
        &self,
        program_id: &str,
        pipeline_id: &str,
        execution_id: &str,
        action: &str,
    ) -> Result<QualityGateResults, ClientError> {
        let execution = self
            .get_execution(program_id, pipeline_id, execution_id)
            .await?;
        let Some(step) = execution.step_for_action(action) else {
            return Ok(QualityGateResults::default());
        };
        let (Some(phase_id), Some(step_id)) = (step.phase_id.as_deref(), step.id.as_deref()) else {
            return Ok(QualityGateResults::default());
        };
        let path = metrics_path(program_id, pipeline_id, execution_id, phase_id, step_id);
        self.get_json(&path, "get quality gate results").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpCloudManagerClient {
        HttpCloudManagerClient::new(Url::parse(base).unwrap(), ImsHeaders::default()).unwrap()
    }

    #[test]
    fn test_url_joins_relative_to_base() {
        let client = client("https://cloudmanager.example.com/");
        let url = client.url(&environments_path("12")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://cloudmanager.example.com/api/program/12/environments"
        );
    }

    #[test]
    fn test_metrics_path_layout() {
        assert_eq!(
            metrics_path("1", "2", "3", "4", "5"),
            "api/program/1/pipeline/2/execution/3/phase/4/step/5/metrics"
        );
    }

    #[test]
    fn test_embedded_list_unwraps_hal_body() {
        let body = serde_json::json!({
            "_embedded": {"programs": [{"id": "1", "name": "Main"}, {"id": "2"}]}
        });
        let programs: Vec<Program> = embedded_list(body, "programs").unwrap();
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].name.as_deref(), Some("Main"));
    }

    #[test]
    fn test_embedded_list_missing_key_is_empty() {
        let programs: Vec<Program> = embedded_list(serde_json::json!({}), "programs").unwrap();
        assert!(programs.is_empty());
    }

    #[test]
    fn test_embedded_list_rejects_malformed_items() {
        let body = serde_json::json!({"_embedded": {"programs": [{"name": "no id"}]}});
        let err = embedded_list::<Program>(body, "programs").unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    mod server {
        use super::*;
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn client_for(server: &MockServer) -> HttpCloudManagerClient {
            HttpCloudManagerClient::new(
                Url::parse(&format!("{}/", server.uri())).unwrap(),
                ImsHeaders {
                    api_key: "client".into(),
                    ims_org_id: "org".into(),
                    access_token: "token".into(),
                },
            )
            .unwrap()
        }

        #[tokio::test]
        async fn test_list_environments_sends_identity_headers() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/program/12/environments"))
                .and(header("authorization", "Bearer token"))
                .and(header("x-api-key", "client"))
                .and(header("x-gw-ims-org-id", "org"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "_embedded": {"environments": [
                        {"id": "7", "name": "pr-1", "status": "ready", "type": "rde"}
                    ]}
                })))
                .expect(1)
                .mount(&server)
                .await;

            let environments = client_for(&server).list_environments("12").await.unwrap();

            assert_eq!(environments.len(), 1);
            assert_eq!(environments[0].id, "7");
            assert_eq!(environments[0].status.as_deref(), Some("ready"));
        }

        #[tokio::test]
        async fn test_create_with_empty_body_is_none() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/program/12/environments"))
                .respond_with(ResponseTemplate::new(201))
                .mount(&server)
                .await;

            let created = client_for(&server)
                .create_environment("12", &EnvironmentSpec::new("pr-1"))
                .await
                .unwrap();

            assert!(created.is_none());
        }

        #[tokio::test]
        async fn test_create_returns_resource_when_body_present() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/program/12/environments"))
                .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                    "id": "8", "name": "pr-1", "status": "creating"
                })))
                .mount(&server)
                .await;

            let created = client_for(&server)
                .create_environment("12", &EnvironmentSpec::new("pr-1"))
                .await
                .unwrap()
                .unwrap();

            assert_eq!(created.id, "8");
        }

        #[tokio::test]
        async fn test_service_unavailable_is_transient() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/program/12/environment/7"))
                .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
                .mount(&server)
                .await;

            let err = client_for(&server).get_environment("12", "7").await.unwrap_err();

            assert!(err.is_transient());
        }

        #[tokio::test]
        async fn test_forbidden_is_unauthorized() {
            let server = MockServer::start().await;
            Mock::given(method("DELETE"))
                .and(path("/api/program/12/environment/7"))
                .respond_with(ResponseTemplate::new(403))
                .mount(&server)
                .await;

            let err = client_for(&server).delete_environment("12", "7").await.unwrap_err();

            assert!(matches!(err, ClientError::Unauthorized { status: 403, .. }));
        }
    }

    #[test]
    fn test_ims_headers_debug_redacts_token() {
        let headers = ImsHeaders {
            api_key: "key".into(),
            ims_org_id: "org".into(),
            access_token: "secret-token".into(),
        };
        assert!(!format!("{headers:?}").contains("secret-token"));
    }
}
