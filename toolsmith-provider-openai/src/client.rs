//! OpenAI API client struct and builder.

use std::future::Future;
use std::time::Duration;

use toolsmith_llm::{
    CompletionRequest, CompletionResponse, Provider, ProviderError, ResponseFormat,
};

use crate::error::{from_status, from_transport, unreadable_body};
use crate::mapping::{from_api_response, to_api_request};

/// Default model used when the request does not name one.
const DEFAULT_MODEL: &str = "gpt-4o";

/// Default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default per-request limit. Agent turns with long tool output are slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for the OpenAI Chat Completions API.
///
/// ```no_run
/// use toolsmith_provider_openai::OpenAi;
///
/// let client = OpenAi::new("sk-...")
///     .model("gpt-4o")
///     .base_url("https://api.openai.com")
///     .organization("org-...")
///     .timeout(std::time::Duration::from_secs(60));
/// ```
#[derive(Clone)]
pub struct OpenAi {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) organization: Option<String>,
    pub(crate) timeout: Duration,
    pub(crate) client: reqwest::Client,
}

impl OpenAi {
    /// Create a new client with the given API key.
    ///
    /// Default model: `gpt-4o`. Default base URL: `https://api.openai.com`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            organization: None,
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Client configured from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and
    /// `OPENAI_ORGANIZATION`. Returns `None` when no key is set.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("OPENAI_API_KEY").ok()?;
        let mut client = Self::new(key);
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            client = client.base_url(url.trim_end_matches('/').trim_end_matches("/v1"));
        }
        if let Ok(org) = std::env::var("OPENAI_ORGANIZATION") {
            client = client.organization(org);
        }
        Some(client)
    }

    /// Override the model used when [`CompletionRequest::model`] is empty.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (mock server, proxy, compatible endpoint).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the organization ID, sent as the `OpenAI-Organization` header.
    pub fn organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Limit on a single request, connection to last body byte.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

impl std::fmt::Debug for OpenAi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAi")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Provider for OpenAi {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send {
        let url = self.completions_url();
        let body = to_api_request(&request, &self.model);
        let structured = matches!(
            request.response_format,
            Some(ResponseFormat::JsonSchema { .. } | ResponseFormat::JsonObject)
        );
        let api_key = self.api_key.clone();
        let organization = self.organization.clone();
        let timeout = self.timeout;
        let http_client = self.client.clone();

        async move {
            tracing::debug!(url = %url, model = %body["model"], "sending completion request to OpenAI");

            let mut builder = http_client
                .post(&url)
                .bearer_auth(&api_key)
                .timeout(timeout)
                .header("content-type", "application/json");
            if let Some(org) = &organization {
                builder = builder.header("OpenAI-Organization", org);
            }
            let response = builder
                .json(&body)
                .send()
                .await
                .map_err(|e| from_transport(e, timeout))?;

            let status = response.status();
            let headers = response.headers().clone();
            let response_text = response.text().await.map_err(|e| from_transport(e, timeout))?;

            if !status.is_success() {
                let err = from_status(status, &headers, &response_text);
                tracing::warn!(status = %status, error = %err, "OpenAI rejected completion request");
                return Err(err);
            }

            let json: serde_json::Value = serde_json::from_str(&response_text)
                .map_err(|e| unreadable_body(&e, &response_text))?;

            from_api_response(&json, structured)
        }
    }
}
