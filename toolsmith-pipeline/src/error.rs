//! Pipeline error type.

use thiserror::Error;
use toolsmith_agent::AgentError;
use toolsmith_llm::LlmError;
use toolsmith_sandbox::SandboxError;

/// Errors that abort a pipeline run.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An agent phase failed (model error, cost ceiling, step budget).
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// The sandbox could not be reset, reached or stopped.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// The repository was installed somewhere other than expected.
    #[error("agent did not install the repository to the expected path: {expected} (reported {actual})")]
    InstallPath {
        /// Deterministic install path.
        expected: String,
        /// Path the agent reported.
        actual: String,
    },

    /// The function never passed assessment.
    #[error("Max iterations reached ({0})")]
    MaxIterations(usize),

    /// The definition has no invocation of this name.
    #[error("unknown invocation `{0}`")]
    UnknownInvocation(String),

    /// A configuration value did not parse.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether the run was stopped by the cost ceiling.
    pub fn is_cost_limit(&self) -> bool {
        matches!(
            self,
            Self::Agent(AgentError::Llm(LlmError::CostLimitExceeded { .. }))
        )
    }
}
