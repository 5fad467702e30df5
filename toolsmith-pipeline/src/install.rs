//! INSTALL: clone and set up the repository.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use toolsmith_agent::{Agent, AgentState, Response};
use toolsmith_llm::{ChatMessage, Completion};
use toolsmith_sandbox::Sandbox;

use crate::config::PipelineConfig;
use crate::definition::ToolDefinition;
use crate::error::PipelineError;
use crate::prompts;

/// Where and how the repository was installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InstalledRepository {
    /// The path to the cloned and installed repository.
    pub path: String,
    /// A one-paragraph summary of what you did and what you accomplished.
    /// Include important paths and files of things you installed or
    /// downloaded.
    pub summary: String,
}

impl Response for InstalledRepository {}

/// Run the install agent and check the reported path.
///
/// The repository must end up at [`ToolDefinition::install_path`]; any other
/// reported path fails with [`PipelineError::InstallPath`].
pub async fn install_repository<C: Completion, S: Sandbox>(
    completion: &C,
    sandbox: &S,
    definition: &ToolDefinition,
    config: &PipelineConfig,
) -> Result<AgentState<InstalledRepository>, PipelineError> {
    let expected = definition.install_path(&config.workspace_dir);
    tracing::info!(repo = %definition.repo.name, path = %expected.display(), "installing repository");

    let state = AgentState::new(())
        .append_message(ChatMessage::system(prompts::system(&config.workspace_dir)))
        .append_message(ChatMessage::user(prompts::install(
            definition,
            &config.workspace_dir,
        )));
    let state: AgentState<InstalledRepository> = Agent::new(completion)
        .max_steps(config.install_max_steps)
        .run(state, sandbox)
        .await?;

    if Path::new(&state.response().path) != expected.as_path() {
        return Err(PipelineError::InstallPath {
            expected: expected.display().to_string(),
            actual: state.response().path.clone(),
        });
    }
    Ok(state)
}
