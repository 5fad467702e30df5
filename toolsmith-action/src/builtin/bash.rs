use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use toolsmith_term::{CommandOptions, run_command};

use crate::action::{Action, ActionContext};
use crate::error::ActionError;

/// An environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentVariable {
    /// The name of the environment variable.
    pub key: String,
    /// The value of the environment variable.
    pub value: String,
}

/// Run a bash command, return the output.
///
/// The command must be non-interactive.
/// Do not use `sudo` or `su` to run the command.
///
/// Some environment variables may be automatically set by the system (e.g. HF_TOKEN).
/// You may use these environment variables in your command without explicitly setting them in the `env` field.
///
/// Always prefer to run a single command at a time because the command output will be truncated if it is too long, thus
/// potentially losing important information.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RunBashCommand {
    /// Why this action is taken.
    #[serde(default)]
    pub reasoning: String,
    /// The bash command to run.
    pub command: String,
    /// Additional environment variables to set before running the command (only visible to the bash command). Do NOT set environment variables here that you want to use from the system instead.
    #[serde(default)]
    pub env: Vec<EnvironmentVariable>,
}

/// Output of a bash command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BashCommandOutput {
    /// Terminal-rendered output of the command.
    pub content: String,
    /// The return code of the bash command.
    pub return_code: i32,
}

impl Action for RunBashCommand {
    const KIND: &'static str = "run_bash_command";
    const SIDE_EFFECT: bool = true;
    type Observation = BashCommandOutput;

    fn reasoning(&self) -> &str {
        &self.reasoning
    }

    fn bash(&self) -> String {
        self.command.clone()
    }

    async fn execute(&self, ctx: &ActionContext) -> Result<BashCommandOutput, ActionError> {
        let mut env = ctx.env.clone();
        env.extend(self.env.iter().map(|e| (e.key.clone(), e.value.clone())));
        let options = CommandOptions::default()
            .cwd(&ctx.workspace_dir)
            .env(env)
            .mirror(ctx.mirror_output);
        let output = run_command(&self.command, &options).await?;
        Ok(BashCommandOutput {
            content: output.transcript,
            return_code: output.exit_code,
        })
    }
}
