//! The repair loop.

use toolsmith_agent::AgentState;
use toolsmith_llm::{ChatMessage, Llm, Provider};
use toolsmith_sandbox::{FunctionCall, Sandbox, SandboxProvider};

use crate::assess::assess_execution;
use crate::code::{implement_function, rewrite_function};
use crate::config::PipelineConfig;
use crate::definition::ToolDefinition;
use crate::diagnose::{diagnose, summarize_problem};
use crate::error::PipelineError;
use crate::plan::make_plan;
use crate::prompts;

/// Build a working function for `definition`.
///
/// Plans and implements once, then loops: rewind the conversation to the
/// first implementation, reset the sandbox, run the current code on the
/// example invocation and assess it. A successful run returns the state with
/// the final [`FunctionCall`] as response. Otherwise the failure is
/// diagnosed, the code rewritten and the attempt summarized; only the
/// summaries and the current code carry over to the next iteration.
///
/// Fails with [`PipelineError::MaxIterations`] once
/// [`PipelineConfig::max_iterations`] runs have failed. The cost ceiling of
/// `llm` aborts the run at the first refused call. The last sandbox is
/// stopped either way.
pub async fn make_tool<P: Provider, SP: SandboxProvider>(
    definition: &ToolDefinition,
    llm: &Llm<P>,
    sandboxes: &SP,
    config: &PipelineConfig,
) -> Result<AgentState<FunctionCall>, PipelineError> {
    let mut sandbox = sandboxes.reset().await?;
    let outcome = repair(definition, llm, sandboxes, &mut sandbox, config).await;
    if let Err(e) = sandbox.stop().await {
        tracing::warn!(error = %e, "could not stop sandbox");
    }
    match &outcome {
        Ok(_) => tracing::info!(tool = %definition.name, cost = %llm.total_cost(), "tool built"),
        Err(e) => tracing::warn!(tool = %definition.name, error = %e, "tool build failed"),
    }
    outcome
}

async fn repair<P: Provider, SP: SandboxProvider>(
    definition: &ToolDefinition,
    llm: &Llm<P>,
    sandboxes: &SP,
    sandbox: &mut SP::Sandbox,
    config: &PipelineConfig,
) -> Result<AgentState<FunctionCall>, PipelineError> {
    let model = llm.for_model(config.model.clone());
    let reasoning = llm.for_model(config.reasoning_model.clone());

    let state = make_plan(&model, &reasoning, &*sandbox, definition, config).await?;
    let plan = state.response().clone();
    let state = implement_function(state, definition, &plan, &reasoning, config).await?;
    let mut code = state.response().clone();
    let checkpoint = state.with_response(());
    let mut summaries: Vec<String> = Vec::new();

    for iteration in 0..config.max_iterations {
        tracing::info!(tool = %definition.name, iteration, "repair iteration");
        let state = checkpoint
            .clone()
            .append_message(ChatMessage::user(prompts::RESET_NOTE));
        sandbox.stop().await?;
        *sandbox = sandboxes.reset().await?;

        let call = FunctionCall {
            code: code.clone(),
            name: definition.name.clone(),
            args: definition.example.arguments.clone(),
        };
        let output = sandbox.run_function(&call).await?;
        tracing::info!(tool = %definition.name, status = %output.status, "function executed");

        let assessment = assess_execution(state.clone(), &output, definition, &model)
            .await?
            .into_response();
        if assessment.successful {
            return Ok(state.with_response(call));
        }
        tracing::info!(reasoning = %assessment.reasoning, "run assessed as unsuccessful");

        let state = diagnose(state, &output, &code, &summaries, &assessment, &model, &*sandbox).await?;
        let diagnosis = state.response().clone();
        let state = rewrite_function(state, definition, &code, &diagnosis, &model).await?;
        code = state.response().clone();
        let summary = summarize_problem(state, &model).await?.into_response();
        summaries.push(summary);
    }

    Err(PipelineError::MaxIterations(config.max_iterations))
}
