//! EXPLORE and PLAN.

use toolsmith_action::Action;
use toolsmith_action::builtin::WriteFile;
use toolsmith_agent::{Agent, AgentState, completion_step};
use toolsmith_llm::{ChatMessage, Completion};
use toolsmith_sandbox::Sandbox;

use crate::config::PipelineConfig;
use crate::definition::ToolDefinition;
use crate::error::PipelineError;
use crate::prompts;

/// Let an agent read through the installed repository and summarize what
/// matters for the tool. The agent cannot write files.
pub async fn explore_repository<C: Completion, S: Sandbox>(
    completion: &C,
    sandbox: &S,
    definition: &ToolDefinition,
    config: &PipelineConfig,
) -> Result<AgentState<String>, PipelineError> {
    tracing::info!(tool = %definition.name, "exploring repository");
    let state = AgentState::new(())
        .append_message(ChatMessage::system(prompts::system_installed(
            definition,
            &config.workspace_dir,
        )))
        .append_message(ChatMessage::user(prompts::explore(
            definition,
            &config.workspace_dir,
        )));
    let state = Agent::new(completion)
        .without(WriteFile::KIND)
        .run(state, sandbox)
        .await?;
    Ok(state)
}

/// Explore, then ask `reasoning` for a numbered outline of the function.
pub async fn make_plan<C: Completion, R: Completion, S: Sandbox>(
    completion: &C,
    reasoning: &R,
    sandbox: &S,
    definition: &ToolDefinition,
    config: &PipelineConfig,
) -> Result<AgentState<String>, PipelineError> {
    let state = explore_repository(completion, sandbox, definition, config).await?;
    tracing::info!(tool = %definition.name, "planning");
    let state = completion_step(
        state.append_message(ChatMessage::user(prompts::plan(definition))),
        reasoning,
    )
    .await?;
    Ok(state)
}
