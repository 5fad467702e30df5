//! DIAGNOSE and SUMMARIZE.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use toolsmith_action::Action;
use toolsmith_action::builtin::WriteFile;
use toolsmith_agent::{Agent, AgentState, Response, completion_step};
use toolsmith_llm::{ChatMessage, Completion};
use toolsmith_sandbox::{FunctionCallResult, Sandbox};

use crate::assess::Assessment;
use crate::error::PipelineError;
use crate::prompts;

/// Root cause and fix for a failed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Diagnosis {
    /// A diagnosis of the issue that occurred.
    pub diagnosis: String,
    /// A plan to fix the issue.
    pub plan: String,
}

impl Response for Diagnosis {}

/// Let an agent investigate the failure in the sandbox and plan a fix.
///
/// `summaries` are the summaries of all earlier repair attempts. The agent
/// cannot write files.
pub async fn diagnose<U, C: Completion, S: Sandbox>(
    state: AgentState<U>,
    output: &FunctionCallResult,
    code: &str,
    summaries: &[String],
    assessment: &Assessment,
    completion: &C,
    sandbox: &S,
) -> Result<AgentState<Diagnosis>, PipelineError> {
    tracing::info!(attempt = summaries.len(), "diagnosing failure");
    let prompt = prompts::diagnose(
        summaries,
        code,
        output.stdout.as_deref().unwrap_or_default(),
        &assessment.reasoning,
    );
    let state = Agent::new(completion)
        .without(WriteFile::KIND)
        .run(state.append_message(ChatMessage::user(prompt)), sandbox)
        .await?;
    Ok(state)
}

/// One-paragraph summary of the latest problem and fix.
pub async fn summarize_problem<U, C: Completion>(
    state: AgentState<U>,
    completion: &C,
) -> Result<AgentState<String>, PipelineError> {
    let state = completion_step(
        state.append_message(ChatMessage::user(prompts::SUMMARIZE)),
        completion,
    )
    .await?;
    Ok(state)
}
