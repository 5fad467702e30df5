//! The [`Action`] trait and its type-erased form.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ActionError;
use crate::observation::Observation;

/// Boxed future used at the object-safe boundary.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where and how actions execute inside the sandbox.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Workspace root; also the working directory for shell commands.
    pub workspace_dir: PathBuf,
    /// Directory holding mounted input data.
    pub mount_dir: PathBuf,
    /// Environment passed to shell commands.
    pub env: HashMap<String, String>,
    /// Mirror command output to the server's stdout.
    pub mirror_output: bool,
}

impl ActionContext {
    /// Context rooted at the given directories, inheriting this process's
    /// environment.
    pub fn new(workspace_dir: impl Into<PathBuf>, mount_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
            mount_dir: mount_dir.into(),
            env: std::env::vars().collect(),
            mirror_output: true,
        }
    }

    /// Enable or disable output mirroring.
    pub fn mirror_output(mut self, mirror: bool) -> Self {
        self.mirror_output = mirror;
        self
    }
}

impl Default for ActionContext {
    fn default() -> Self {
        Self::new("/workspace", "/mount")
    }
}

/// A strongly-typed action.
///
/// The struct's fields are the action's arguments; its schemars schema is
/// what the model sees. Implementors should use
/// `#[serde(deny_unknown_fields)]` so stray arguments are rejected.
pub trait Action: Serialize + DeserializeOwned + JsonSchema + fmt::Debug + Send + Sync + 'static {
    /// Unique kind tag, used as the tool name and the dispatch key.
    const KIND: &'static str;
    /// Whether executing the action changes the sandbox.
    const SIDE_EFFECT: bool;
    /// Declared result type.
    type Observation: Serialize + DeserializeOwned + JsonSchema + Send;

    /// Why the model chose this action.
    fn reasoning(&self) -> &str;

    /// Equivalent shell command, for audit logs.
    fn bash(&self) -> String;

    /// Whether the agent may truncate this action's observation.
    fn may_truncate(&self) -> bool {
        true
    }

    /// Execute the action inside the sandbox.
    fn execute(
        &self,
        ctx: &ActionContext,
    ) -> impl Future<Output = Result<Self::Observation, ActionError>> + Send;
}

/// Type-erased action for dynamic dispatch. Blanket-implemented for every
/// [`Action`].
pub trait AnyAction: fmt::Debug + Send + Sync {
    /// Kind tag.
    fn kind(&self) -> &'static str;
    /// Why the model chose this action.
    fn reasoning(&self) -> &str;
    /// Whether the action changes the sandbox.
    fn side_effect(&self) -> bool;
    /// Equivalent shell command.
    fn bash(&self) -> String;
    /// Whether the observation may be truncated.
    fn may_truncate(&self) -> bool;
    /// Request body: the action's fields plus an `action` kind tag.
    fn to_request(&self) -> Result<Value, ActionError>;
    /// Decode a response body as this action's declared observation type.
    fn decode_observation(&self, body: &str) -> Result<Observation, ActionError>;
    /// Execute and convert the typed observation into the generic shape.
    fn execute_dyn<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<Observation, ActionError>>;
}

impl<A: Action> AnyAction for A {
    fn kind(&self) -> &'static str {
        A::KIND
    }

    fn reasoning(&self) -> &str {
        Action::reasoning(self)
    }

    fn side_effect(&self) -> bool {
        A::SIDE_EFFECT
    }

    fn bash(&self) -> String {
        Action::bash(self)
    }

    fn may_truncate(&self) -> bool {
        Action::may_truncate(self)
    }

    fn to_request(&self) -> Result<Value, ActionError> {
        let mut body = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut body {
            map.insert("action".into(), Value::String(A::KIND.into()));
        }
        Ok(body)
    }

    fn decode_observation(&self, body: &str) -> Result<Observation, ActionError> {
        let typed: A::Observation = serde_json::from_str(body)?;
        Ok(Observation::from_typed(&typed)?)
    }

    fn execute_dyn<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<Observation, ActionError>> {
        Box::pin(async move {
            let typed = self.execute(ctx).await?;
            Ok(Observation::from_typed(&typed)?)
        })
    }
}
