//! IMPLEMENT and REWRITE.

use toolsmith_agent::{AgentState, completion_step};
use toolsmith_llm::{ChatMessage, Completion};

use crate::config::PipelineConfig;
use crate::definition::ToolDefinition;
use crate::diagnose::Diagnosis;
use crate::error::PipelineError;
use crate::prompts;

/// Strip a surrounding ```` ```python ```` or ```` ``` ```` fence.
pub fn strip_code_fences(code: &str) -> String {
    let code = code.trim();
    let inner = code
        .strip_prefix("```python")
        .or_else(|| code.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"));
    inner.unwrap_or(code).to_string()
}

/// Write the first version of the function from `plan`.
pub async fn implement_function<U, C: Completion>(
    state: AgentState<U>,
    definition: &ToolDefinition,
    plan: &str,
    completion: &C,
    config: &PipelineConfig,
) -> Result<AgentState<String>, PipelineError> {
    tracing::info!(tool = %definition.name, "implementing function");
    let prompt = prompts::implement(definition, plan, &config.workspace_dir);
    let state: AgentState<String> =
        completion_step(state.append_message(ChatMessage::user(prompt)), completion).await?;
    Ok(state.map_response(|code| strip_code_fences(&code)))
}

/// Write the next version of the function from a diagnosis.
pub async fn rewrite_function<U, C: Completion>(
    state: AgentState<U>,
    definition: &ToolDefinition,
    code: &str,
    diagnosis: &Diagnosis,
    completion: &C,
) -> Result<AgentState<String>, PipelineError> {
    tracing::info!(tool = %definition.name, "rewriting function");
    let prompt = prompts::rewrite(definition, code, &diagnosis.diagnosis, &diagnosis.plan);
    let state: AgentState<String> =
        completion_step(state.append_message(ChatMessage::user(prompt)), completion).await?;
    Ok(state.map_response(|code| strip_code_fences(&code)))
}
