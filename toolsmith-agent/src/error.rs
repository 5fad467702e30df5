//! Agent error type.

use thiserror::Error;
use toolsmith_llm::LlmError;

/// Errors that end an agent run.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model call failed (including the cost ceiling).
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The model's final answer did not parse as the expected response.
    #[error("could not parse model response: {0}")]
    Response(String),

    /// No response within the step budget.
    #[error("agent has exhausted its maximum number of steps ({0})")]
    StepsExhausted(usize),

    /// Encoding an observation failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
