//! Running a finished tool.

use std::time::Instant;

use toolsmith_sandbox::{FunctionCall, Sandbox, SandboxProvider, ToolRunResult};

use crate::definition::ToolDefinition;
use crate::error::PipelineError;

/// Run `code` in a fresh sandbox on the invocation called `invocation`
/// (the example when `None`), timing the call.
///
/// `output_path` is recorded in the result as-is. The sandbox is stopped
/// afterwards, also when the call fails.
pub async fn run_tool<SP: SandboxProvider>(
    definition: &ToolDefinition,
    code: &str,
    invocation: Option<&str>,
    sandboxes: &SP,
    output_path: impl Into<String>,
) -> Result<ToolRunResult, PipelineError> {
    let name = invocation.unwrap_or("example");
    let invocation = definition
        .invocation(name)
        .ok_or_else(|| PipelineError::UnknownInvocation(name.to_string()))?;
    let call = FunctionCall {
        code: code.to_string(),
        name: definition.name.clone(),
        args: invocation.arguments.clone(),
    };

    let sandbox = sandboxes.reset().await?;
    let started = Instant::now();
    let result = sandbox.run_function(&call).await;
    let elapsed = started.elapsed().as_secs_f64();
    let stopped = sandbox.stop().await;
    let result = result?;
    stopped?;

    tracing::info!(tool = %definition.name, invocation = name, elapsed, status = %result.status, "tool ran");
    Ok(ToolRunResult {
        call: result,
        output_path: output_path.into(),
        elapsed,
    })
}
