//! Azure OpenAI deployments.

use std::fmt;

use crate::error::{LlmError, Result};
use crate::openai::{ChatRequest, execute_chat};
use crate::provider::{Completion, CompletionRequest, LlmProvider};

pub const DEFAULT_API_VERSION: &str = "2024-06-01";

#[derive(Clone)]
pub struct AzureOpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    api_version: String,
}

impl fmt::Debug for AzureOpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Strip trailing slashes and a trailing `/openai` segment from a resource URL.
#[must_use]
pub fn clean_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/openai").unwrap_or(trimmed);
    trimmed.trim_end_matches('/').to_owned()
}

impl AzureOpenAiProvider {
    #[must_use]
    pub fn new(api_key: String, base_url: &str, api_version: Option<String>) -> Self {
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url: clean_base_url(base_url),
            api_version: api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_owned()),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Chat completions URL for a deployment.
    #[must_use]
    pub fn deployment_url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{deployment}/chat/completions?api-version={}",
            self.base_url, self.api_version
        )
    }
}

impl LlmProvider for AzureOpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        if self.base_url.is_empty() {
            return Err(LlmError::InvalidRequest(
                "azure: AZURE_OPENAI_API_BASE is not configured".into(),
            ));
        }
        tracing::debug!(deployment = %request.model, "using Azure deployment");
        let body = ChatRequest::from_request(request, false);
        let builder = self
            .client
            .post(self.deployment_url(&request.model))
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body);
        execute_chat("azure", builder).await
    }

    fn name(&self) -> &'static str {
        "azure"
    }
}
