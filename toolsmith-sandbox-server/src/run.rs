//! Running generated functions.

use std::collections::HashMap;
use std::io::ErrorKind;

use serde_json::{Value, json};
use toolsmith_sandbox::{CallStatus, FunctionCall, FunctionCallResult};
use toolsmith_term::{CommandOptions, run_command};

use crate::config::ServerConfig;
use crate::error::RunError;

/// Run `call` through the configured runner.
///
/// Writes `function.py` and `info.json` into the function directory, clears
/// any stale `output.json`, then runs `<interpreter> <runner> <info>` from the
/// workspace with the toolmaker directory appended to `PATH`. On exit 0 the
/// `result` field of `output.json` is returned; any other exit code gives an
/// error status.
pub async fn run_function(
    config: &ServerConfig,
    env: &HashMap<String, String>,
    call: &FunctionCall,
) -> Result<FunctionCallResult, RunError> {
    let dir = config.function_dir();
    tokio::fs::create_dir_all(&dir).await?;
    let function_path = dir.join("function.py");
    let info_path = dir.join("info.json");
    let output_path = dir.join("output.json");

    tokio::fs::write(&function_path, &call.code).await?;
    let info = json!({
        "path": function_path.to_string_lossy(),
        "code": call.code,
        "name": call.name,
        "args": call.args,
        "output_path": output_path.to_string_lossy(),
    });
    tokio::fs::write(&info_path, info.to_string()).await?;
    match tokio::fs::remove_file(&output_path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    let runner = config.runner_path.to_string_lossy();
    let info_arg = info_path.to_string_lossy();
    let command = shlex::try_join([config.interpreter.as_str(), &runner, &info_arg])
        .map_err(|e| RunError::Command(e.to_string()))?;

    let mut env = env.clone();
    let path = match env.get("PATH") {
        Some(path) if !path.is_empty() => format!("{path}:{}", config.toolmaker_dir.display()),
        _ => config.toolmaker_dir.display().to_string(),
    };
    env.insert("PATH".into(), path);

    tracing::info!(function = %call.name, command = %command, "running function");
    let options = CommandOptions::default()
        .cwd(config.workspace_dir.clone())
        .env(env)
        .mirror(config.mirror);
    let output = run_command(&command, &options).await?;

    if output.exit_code != 0 {
        tracing::debug!(function = %call.name, exit_code = output.exit_code, "function failed");
        return Ok(FunctionCallResult {
            status: CallStatus::Error,
            result: Value::String(format!(
                "Process failed with return code {}",
                output.exit_code
            )),
            stdout: Some(output.transcript),
        });
    }

    let text = match tokio::fs::read_to_string(&output_path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(RunError::MissingOutput(output_path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    let mut parsed: Value =
        serde_json::from_str(&text).map_err(|e| RunError::MalformedOutput(e.to_string()))?;
    let Some(result) = parsed.get_mut("result").map(Value::take) else {
        return Err(RunError::MalformedOutput(
            "output has no \"result\" field".into(),
        ));
    };

    Ok(FunctionCallResult {
        status: CallStatus::Success,
        result,
        stdout: Some(output.transcript),
    })
}
