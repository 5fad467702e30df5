//! Server tests over real HTTP, with `sh` standing in for the Python runner.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use toolsmith_action::{ActionRegistry, AnyAction, ERROR_CONTENT};
use toolsmith_sandbox::{CallStatus, FunctionCall, HttpSandbox, Sandbox, SandboxError};
use toolsmith_sandbox_server::{AppState, RunError, ServerConfig, router, run_function};

const FAKE_RUNNER: &str = r#"
dir=$(dirname "$1")
if grep -q fail "$dir/function.py"; then echo boom; exit 1; fi
if grep -q silent "$dir/function.py"; then exit 0; fi
if grep -q garbage "$dir/function.py"; then echo 'not json' > "$dir/output.json"; exit 0; fi
echo "running in $(pwd)"
printf '{"result": {"answer": 42}}' > "$dir/output.json"
"#;

struct Fixture {
    dir: TempDir,
    config: ServerConfig,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();
        let runner = dir.path().join("runner.sh");
        std::fs::write(&runner, FAKE_RUNNER).unwrap();
        let config = ServerConfig::new(&workspace, dir.path().join("mount"), dir.path().join("toolmaker"))
            .interpreter("sh")
            .runner_path(runner)
            .mirror(false);
        Self { dir, config }
    }

    fn workspace(&self) -> &Path {
        &self.config.workspace_dir
    }

    async fn serve(&self) -> HttpSandbox {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(AppState::new(self.config.clone()));
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        HttpSandbox::new(format!("http://{addr}")).env(HashMap::new())
    }
}

fn call(code: &str) -> FunctionCall {
    FunctionCall {
        code: code.into(),
        name: "predict".into(),
        args: Vec::new(),
    }
}

fn action(kind: &str, args: serde_json::Value) -> Arc<dyn AnyAction> {
    ActionRegistry::builtin().parse(kind, args).unwrap()
}

fn env() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[tokio::test]
async fn run_success_returns_embedded_result() {
    let fx = Fixture::new();
    let result = run_function(&fx.config, &env(), &call("def predict(): ...")).await.unwrap();
    assert_eq!(result.status, CallStatus::Success);
    assert_eq!(result.result, json!({"answer": 42}));
    let stdout = result.stdout.unwrap();
    assert!(stdout.contains("running in"), "{stdout}");
    assert!(stdout.contains("workspace"), "{stdout}");

    let function_dir = fx.config.function_dir();
    let source = std::fs::read_to_string(function_dir.join("function.py")).unwrap();
    assert_eq!(source, "def predict(): ...");
    let info: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(function_dir.join("info.json")).unwrap()).unwrap();
    assert_eq!(info["name"], "predict");
    assert!(info["output_path"].as_str().unwrap().ends_with("output.json"));
}

#[tokio::test]
async fn run_nonzero_exit_reports_return_code() {
    let fx = Fixture::new();
    let result = run_function(&fx.config, &env(), &call("fail")).await.unwrap();
    assert_eq!(result.status, CallStatus::Error);
    assert_eq!(result.result, json!("Process failed with return code 1"));
    assert!(result.stdout.unwrap().contains("boom"));
}

#[tokio::test]
async fn run_clears_stale_output() {
    let fx = Fixture::new();
    run_function(&fx.config, &env(), &call("ok")).await.unwrap();
    let err = run_function(&fx.config, &env(), &call("silent")).await.unwrap_err();
    assert!(matches!(err, RunError::MissingOutput(_)), "{err}");
}

#[tokio::test]
async fn run_malformed_output_is_an_error() {
    let fx = Fixture::new();
    let err = run_function(&fx.config, &env(), &call("garbage")).await.unwrap_err();
    assert!(matches!(err, RunError::MalformedOutput(_)), "{err}");
}

#[tokio::test]
async fn run_appends_toolmaker_dir_to_path() {
    let fx = Fixture::new();
    let runner = fx.dir.path().join("path.sh");
    std::fs::write(
        &runner,
        r#"printf '{"result": "%s"}' "$PATH" > "$(dirname "$1")/output.json""#,
    )
    .unwrap();
    let config = fx.config.clone().runner_path(runner);
    let env = HashMap::from([("PATH".to_string(), "/usr/bin:/bin".to_string())]);
    let result = run_function(&config, &env, &call("")).await.unwrap();
    let expected = format!("/usr/bin:/bin:{}", config.toolmaker_dir.display());
    assert_eq!(result.result, json!(expected));
}

#[tokio::test]
async fn alive_over_http() {
    let fx = Fixture::new();
    let sandbox = fx.serve().await;
    assert_eq!(sandbox.alive().await.unwrap().status, "ok");
}

#[tokio::test]
async fn execute_write_then_read_over_http() {
    let fx = Fixture::new();
    let sandbox = fx.serve().await;
    let path = fx.workspace().join("notes/a.txt");
    let path = path.to_str().unwrap();

    let written = sandbox
        .execute(action("write_file", json!({"path": path, "content": "hello"})).as_ref())
        .await
        .unwrap();
    assert!(!written.is_error());
    assert_eq!(written.field("filename"), Some(&json!(path)));

    let read = sandbox
        .execute(action("read_file", json!({"path": path})).as_ref())
        .await
        .unwrap();
    assert_eq!(read.content, json!("hello"));
}

#[tokio::test]
async fn failing_action_yields_error_observation() {
    let fx = Fixture::new();
    let sandbox = fx.serve().await;
    let missing = fx.workspace().join("missing.txt");
    let obs = sandbox
        .execute(action("read_file", json!({"path": missing.to_str().unwrap()})).as_ref())
        .await
        .unwrap();
    assert!(obs.is_error());
    assert_eq!(obs.content, json!(ERROR_CONTENT));
    let error = obs.field("error").and_then(|e| e.as_str()).unwrap();
    assert!(error.starts_with("File not found"), "{error}");
}

#[tokio::test]
async fn unknown_kind_is_404_with_error_observation() {
    let fx = Fixture::new();
    let sandbox = fx.serve().await;
    let response = reqwest::Client::new()
        .post(format!("{}/execute/fly", sandbox.base_url()))
        .json(&json!({"action": "fly"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["content"], ERROR_CONTENT);
    assert!(body["error"].as_str().unwrap().contains("fly"));
}

#[tokio::test]
async fn run_over_http() {
    let fx = Fixture::new();
    let sandbox = fx.serve().await;

    let ok = sandbox.run_function(&call("ok")).await.unwrap();
    assert_eq!(ok.result, json!({"answer": 42}));

    let failed = sandbox.run_function(&call("fail")).await.unwrap();
    assert_eq!(failed.status, CallStatus::Error);
    assert!(failed.result.as_str().unwrap().contains('1'));

    let err = sandbox.run_function(&call("silent")).await.unwrap_err();
    assert!(matches!(err, SandboxError::Contract(_)), "{err}");
}

#[tokio::test]
async fn requests_are_serialized() {
    let fx = Fixture::new();
    let sandbox = fx.serve().await;
    let command = "echo start >> log.txt; sleep 0.3; echo end >> log.txt";
    let first = action("run_bash_command", json!({"command": command}));
    let second = action("run_bash_command", json!({"command": command}));

    let (a, b) = tokio::join!(sandbox.execute(first.as_ref()), sandbox.execute(second.as_ref()));
    assert_eq!(a.unwrap().field("return_code"), Some(&json!(0)));
    assert_eq!(b.unwrap().field("return_code"), Some(&json!(0)));

    let log = std::fs::read_to_string(fx.workspace().join("log.txt")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines, ["start", "end", "start", "end"]);
}
