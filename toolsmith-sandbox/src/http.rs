//! JSON-over-HTTP sandbox client.

use std::collections::{HashMap, HashSet};

use toolsmith_action::{AnyAction, ErrorObservation, Observation};

use crate::client::Sandbox;
use crate::env::default_allowed;
use crate::error::SandboxError;
use crate::records::{FunctionCall, FunctionCallResult, StatusResponse};

/// Client for a sandbox server at a base URL.
///
/// ```no_run
/// use toolsmith_sandbox::HttpSandbox;
///
/// let sandbox = HttpSandbox::new("http://localhost:8000");
/// ```
#[derive(Debug, Clone)]
pub struct HttpSandbox {
    base_url: String,
    client: reqwest::Client,
    env: Option<HashMap<String, String>>,
    allowed_env: HashSet<String>,
}

impl HttpSandbox {
    /// Client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            env: None,
            allowed_env: default_allowed(),
        }
    }

    /// Environment used to resolve `${env:NAME}` placeholders. Defaults to
    /// this process's environment, read at call time.
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Variables that may be substituted. Defaults to `HF_TOKEN` only.
    pub fn allowed_env(mut self, allowed: HashSet<String>) -> Self {
        self.allowed_env = allowed;
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Base URL of the server.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check `GET /alive`.
    pub async fn alive(&self) -> Result<StatusResponse, SandboxError> {
        let response = self
            .client
            .get(format!("{}/alive", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

impl Sandbox for HttpSandbox {
    async fn execute(&self, action: &dyn AnyAction) -> Result<Observation, SandboxError> {
        let url = format!("{}/execute/{}", self.base_url, action.kind());
        let body = action
            .to_request()
            .map_err(|e| SandboxError::Decode(format!("could not encode action: {e}")))?;
        tracing::debug!(url = %url, "executing action in sandbox");

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return action
                .decode_observation(&text)
                .map_err(|e| SandboxError::Decode(e.to_string()));
        }
        tracing::debug!(url = %url, status = %status, "action failed in sandbox");
        let error = serde_json::from_str::<ErrorObservation>(&text)
            .unwrap_or_else(|_| ErrorObservation::new(format!("HTTP {status}: {text}")));
        Ok(error.into())
    }

    async fn run_function(&self, call: &FunctionCall) -> Result<FunctionCallResult, SandboxError> {
        let env = match &self.env {
            Some(env) => env.clone(),
            None => std::env::vars().collect(),
        };
        let call = call.substitute_env_vars(&env, &self.allowed_env);
        let url = format!("{}/run", self.base_url);
        tracing::info!(url = %url, function = %call.name, "running function in sandbox");

        let response = self.client.post(&url).json(&call).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(SandboxError::Contract(format!(
                "/run answered HTTP {status}: {text}"
            )));
        }
        serde_json::from_str(&text).map_err(|e| SandboxError::Decode(e.to_string()))
    }

    async fn stop(&self) -> Result<(), SandboxError> {
        Ok(())
    }
}
