//! Bearer token providers.

use async_trait::async_trait;

use crate::errors::{RdeflowError, Result};

/// Context name under which the action's credential is registered.
pub const IMS_CONTEXT: &str = "aio-cloudmanager-github-actions";

/// Supplies bearer tokens for API calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns an access token for the named credential context.
    async fn get_token(&self, context: &str) -> Result<String>;
}

/// A provider holding a token issued ahead of the run.
#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl StaticTokenProvider {
    /// Creates a provider for the given token.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self, context: &str) -> Result<String> {
        match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(RdeflowError::Authentication(format!(
                "no access token available for context '{context}'"
            ))),
        }
    }
}
