//! Records exchanged across the sandbox boundary.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::env::substitute_env_vars;

/// One named argument of a function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionArg {
    /// Parameter name.
    pub name: String,
    /// Argument value.
    pub value: Value,
}

impl FunctionArg {
    /// Argument `name = value`.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A generated function and the arguments to call it with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Python source defining the function.
    pub code: String,
    /// Name of the function to call.
    pub name: String,
    /// Arguments, in declaration order.
    pub args: Vec<FunctionArg>,
}

impl FunctionCall {
    /// Copy with `${env:NAME}` placeholders in string arguments resolved.
    ///
    /// Only top-level string values are rewritten; other values are copied
    /// unchanged.
    pub fn substitute_env_vars(
        &self,
        env: &HashMap<String, String>,
        allowed: &HashSet<String>,
    ) -> Self {
        let args = self
            .args
            .iter()
            .map(|arg| match &arg.value {
                Value::String(s) => FunctionArg {
                    name: arg.name.clone(),
                    value: Value::String(substitute_env_vars(s, env, allowed)),
                },
                _ => arg.clone(),
            })
            .collect();
        Self {
            code: self.code.clone(),
            name: self.name.clone(),
            args,
        }
    }
}

/// Outcome of running a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// The process exited with code 0.
    Success,
    /// The process exited with a non-zero code.
    Error,
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
        })
    }
}

/// Result of running a function inside the sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallResult {
    /// Whether the process succeeded.
    pub status: CallStatus,
    /// The returned value on success, or a failure description.
    #[serde(default)]
    pub result: Value,
    /// Transcript of the process output.
    #[serde(default)]
    pub stdout: Option<String>,
}

impl FunctionCallResult {
    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        self.status == CallStatus::Success
    }
}

/// A [`FunctionCallResult`] with where it was saved and how long it took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRunResult {
    /// The call result.
    #[serde(flatten)]
    pub call: FunctionCallResult,
    /// Where the outputs of the run were written.
    pub output_path: String,
    /// Wall-clock duration in seconds.
    pub elapsed: f64,
}

/// Body of `GET /alive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Always `"ok"`.
    pub status: String,
}

impl Default for StatusResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
        }
    }
}
