//! ASSESS: did the run do what it should?

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use toolsmith_agent::{AgentState, Response, completion_step};
use toolsmith_llm::{ChatMessage, Completion};
use toolsmith_sandbox::{CallStatus, FunctionCallResult};

use crate::definition::ToolDefinition;
use crate::error::PipelineError;
use crate::prompts;

/// Verdict on one function run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Assessment {
    /// Whether the function call was successful, and the task is complete.
    pub successful: bool,
    /// The reasoning for the assessment.
    pub reasoning: String,
}

impl Response for Assessment {}

/// Judge `output`.
///
/// A non-zero exit is unsuccessful without asking the model; otherwise the
/// model decides from the result and the transcript.
pub async fn assess_execution<U, C: Completion>(
    state: AgentState<U>,
    output: &FunctionCallResult,
    definition: &ToolDefinition,
    completion: &C,
) -> Result<AgentState<Assessment>, PipelineError> {
    let result = serde_json::to_string(&output.result).unwrap_or_default();
    let stdout = output.stdout.as_deref().unwrap_or_default();
    let state = state.append_message(ChatMessage::user(prompts::assess(
        definition, &result, stdout,
    )));

    if output.status == CallStatus::Error {
        let assessment = Assessment {
            successful: false,
            reasoning: prompts::NONZERO_EXIT_REASONING.into(),
        };
        let reply = serde_json::to_string(&assessment).unwrap_or_default();
        return Ok(state
            .append_message(ChatMessage::assistant(reply))
            .with_response(assessment));
    }

    tracing::debug!(tool = %definition.name, "exit code 0, asking the model to assess");
    Ok(completion_step(state, completion).await?)
}
