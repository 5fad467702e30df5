//! Fresh sandboxes on demand.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use toolsmith_action::{AnyAction, Observation};

use crate::client::Sandbox;
use crate::error::SandboxError;
use crate::http::HttpSandbox;
use crate::records::{FunctionCall, FunctionCallResult};

/// Factory for sandboxes in a known-good starting state.
pub trait SandboxProvider: Send + Sync {
    /// Sandbox type handed out.
    type Sandbox: Sandbox;

    /// A new sandbox, reset to the starting state.
    fn reset(&self) -> impl Future<Output = Result<Self::Sandbox, SandboxError>> + Send;
}

/// A running container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Container name.
    pub name: String,
    /// Base URL of the sandbox server inside it.
    pub url: String,
}

/// Container operations, supplied by the host environment.
pub trait ContainerLifecycle: Send + Sync + 'static {
    /// Save the current installation as checkpoint image `tag`.
    fn build(&self, tag: &str) -> impl Future<Output = Result<(), SandboxError>> + Send;

    /// Start container `name` from checkpoint `tag`, replacing any container
    /// of the same name.
    fn load_checkpoint(
        &self,
        name: &str,
        tag: &str,
    ) -> impl Future<Output = Result<ContainerHandle, SandboxError>> + Send;

    /// Stop and remove a container.
    fn stop(&self, handle: &ContainerHandle) -> impl Future<Output = Result<(), SandboxError>> + Send;
}

/// [`SandboxProvider`] that reloads a container checkpoint on every reset.
#[derive(Debug)]
pub struct CheckpointSandboxProvider<L> {
    lifecycle: Arc<L>,
    name: String,
    tag: String,
    alive_attempts: u32,
    alive_interval: Duration,
}

impl<L: ContainerLifecycle> CheckpointSandboxProvider<L> {
    /// Provider loading checkpoint `tag` as container `name`.
    pub fn new(lifecycle: L, name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            lifecycle: Arc::new(lifecycle),
            name: name.into(),
            tag: tag.into(),
            alive_attempts: 30,
            alive_interval: Duration::from_secs(1),
        }
    }

    /// How many times, and how often, to poll `/alive` after loading.
    pub fn alive_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.alive_attempts = attempts.max(1);
        self.alive_interval = interval;
        self
    }

    /// Save the current installation as this provider's checkpoint.
    pub async fn build_checkpoint(&self) -> Result<(), SandboxError> {
        tracing::info!(tag = %self.tag, "building checkpoint");
        self.lifecycle.build(&self.tag).await
    }

    /// The lifecycle this provider drives.
    pub fn lifecycle(&self) -> &L {
        &self.lifecycle
    }
}

impl<L: ContainerLifecycle> SandboxProvider for CheckpointSandboxProvider<L> {
    type Sandbox = CheckpointSandbox<L>;

    async fn reset(&self) -> Result<CheckpointSandbox<L>, SandboxError> {
        tracing::info!(name = %self.name, tag = %self.tag, "loading checkpoint");
        let handle = self.lifecycle.load_checkpoint(&self.name, &self.tag).await?;
        let client = HttpSandbox::new(handle.url.clone());

        let mut attempts = 0;
        loop {
            attempts += 1;
            match client.alive().await {
                Ok(_) => break,
                Err(e) if attempts < self.alive_attempts => {
                    tracing::debug!(url = %handle.url, attempts, error = %e, "sandbox not alive yet");
                    tokio::time::sleep(self.alive_interval).await;
                }
                Err(_) => {
                    self.lifecycle.stop(&handle).await?;
                    return Err(SandboxError::NotAlive {
                        url: handle.url,
                        attempts,
                    });
                }
            }
        }

        Ok(CheckpointSandbox {
            client,
            handle,
            lifecycle: Arc::clone(&self.lifecycle),
        })
    }
}

/// Sandbox in a container started from a checkpoint. Stopping it stops the
/// container.
#[derive(Debug)]
pub struct CheckpointSandbox<L> {
    client: HttpSandbox,
    handle: ContainerHandle,
    lifecycle: Arc<L>,
}

impl<L> CheckpointSandbox<L> {
    /// The container this sandbox runs in.
    pub fn handle(&self) -> &ContainerHandle {
        &self.handle
    }
}

impl<L: ContainerLifecycle> Sandbox for CheckpointSandbox<L> {
    async fn execute(&self, action: &dyn AnyAction) -> Result<Observation, SandboxError> {
        self.client.execute(action).await
    }

    async fn run_function(&self, call: &FunctionCall) -> Result<FunctionCallResult, SandboxError> {
        self.client.run_function(call).await
    }

    async fn stop(&self) -> Result<(), SandboxError> {
        tracing::info!(name = %self.handle.name, "stopping sandbox container");
        self.lifecycle.stop(&self.handle).await
    }
}
