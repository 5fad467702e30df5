//! Sandbox client tests against a wiremock server.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;
use toolsmith_action::{ActionRegistry, ERROR_CONTENT};
use toolsmith_sandbox::{
    CallStatus, CheckpointSandboxProvider, ContainerHandle, ContainerLifecycle, FunctionArg,
    FunctionCall, HttpSandbox, Sandbox, SandboxError, SandboxProvider,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn read_file(path: &str) -> std::sync::Arc<dyn toolsmith_action::AnyAction> {
    ActionRegistry::builtin()
        .parse("read_file", json!({"path": path}))
        .unwrap()
}

#[tokio::test]
async fn execute_posts_tagged_body_and_decodes_observation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/execute/read_file"))
        .and(body_partial_json(json!({"action": "read_file", "path": "/workspace/a.txt"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "hello"})))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = HttpSandbox::new(server.uri());
    let obs = sandbox.execute(read_file("/workspace/a.txt").as_ref()).await.unwrap();
    assert_eq!(obs.content, json!("hello"));
    assert!(!obs.is_error());
}

#[tokio::test]
async fn execute_500_yields_error_observation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/execute/read_file"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "content": ERROR_CONTENT,
            "error": "File not found: /nope"
        })))
        .mount(&server)
        .await;

    let sandbox = HttpSandbox::new(server.uri());
    let obs = sandbox.execute(read_file("/nope").as_ref()).await.unwrap();
    assert!(obs.is_error());
    assert_eq!(obs.field("error"), Some(&json!("File not found: /nope")));
}

#[tokio::test]
async fn execute_500_with_plain_body_is_wrapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let sandbox = HttpSandbox::new(server.uri());
    let obs = sandbox.execute(read_file("/x").as_ref()).await.unwrap();
    assert!(obs.is_error());
    let error = obs.field("error").and_then(|e| e.as_str()).unwrap();
    assert!(error.starts_with("HTTP 500"), "{error}");
    assert!(error.contains("Internal Server Error"));
}

#[tokio::test]
async fn run_function_substitutes_allowed_variables() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .and(body_partial_json(json!({
            "name": "predict",
            "args": [
                {"name": "token", "value": "hf_secret"},
                {"name": "other", "value": "${env:OTHER}"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "result": {"label": "cat"},
            "stdout": "ok"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let env = HashMap::from([
        ("HF_TOKEN".to_string(), "hf_secret".to_string()),
        ("OTHER".to_string(), "leak".to_string()),
    ]);
    let sandbox = HttpSandbox::new(server.uri()).env(env);
    let call = FunctionCall {
        code: "def predict(token, other): ...".into(),
        name: "predict".into(),
        args: vec![
            FunctionArg::new("token", "${env:HF_TOKEN}"),
            FunctionArg::new("other", "${env:OTHER}"),
        ],
    };
    let result = sandbox.run_function(&call).await.unwrap();
    assert_eq!(result.status, CallStatus::Success);
    assert_eq!(result.result, json!({"label": "cat"}));
}

#[tokio::test]
async fn run_function_allow_list_is_configurable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .and(body_partial_json(json!({"args": [{"name": "k", "value": "v"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "result": null})))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = HttpSandbox::new(server.uri())
        .env(HashMap::from([("KEY".to_string(), "v".to_string())]))
        .allowed_env(HashSet::from(["KEY".to_string()]));
    let call = FunctionCall {
        code: String::new(),
        name: "f".into(),
        args: vec![FunctionArg::new("k", "${env:KEY}")],
    };
    sandbox.run_function(&call).await.unwrap();
}

#[tokio::test]
async fn run_function_failure_status_is_contract_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "content": ERROR_CONTENT,
            "error": "output file missing"
        })))
        .mount(&server)
        .await;

    let sandbox = HttpSandbox::new(server.uri());
    let call = FunctionCall {
        code: String::new(),
        name: "f".into(),
        args: Vec::new(),
    };
    let err = sandbox.run_function(&call).await.unwrap_err();
    assert!(matches!(err, SandboxError::Contract(_)), "{err}");
}

#[tokio::test]
async fn alive_reports_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let status = HttpSandbox::new(format!("{}/", server.uri())).alive().await.unwrap();
    assert_eq!(status.status, "ok");
}

#[derive(Debug, Default)]
struct FakeLifecycle {
    url: String,
    events: Mutex<Vec<String>>,
}

impl ContainerLifecycle for FakeLifecycle {
    async fn build(&self, tag: &str) -> Result<(), SandboxError> {
        self.events.lock().unwrap().push(format!("build {tag}"));
        Ok(())
    }

    async fn load_checkpoint(&self, name: &str, tag: &str) -> Result<ContainerHandle, SandboxError> {
        self.events.lock().unwrap().push(format!("load {name} {tag}"));
        Ok(ContainerHandle {
            name: name.to_string(),
            url: self.url.clone(),
        })
    }

    async fn stop(&self, handle: &ContainerHandle) -> Result<(), SandboxError> {
        self.events.lock().unwrap().push(format!("stop {}", handle.name));
        Ok(())
    }
}

#[tokio::test]
async fn checkpoint_provider_reloads_and_stops_containers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let lifecycle = FakeLifecycle {
        url: server.uri(),
        ..Default::default()
    };
    let provider = CheckpointSandboxProvider::new(lifecycle, "tool-box", "installed-demo")
        .alive_polling(3, Duration::ZERO);
    provider.build_checkpoint().await.unwrap();
    let sandbox = provider.reset().await.unwrap();
    assert_eq!(sandbox.handle().name, "tool-box");
    sandbox.stop().await.unwrap();

    let events = provider.lifecycle().events.lock().unwrap().clone();
    assert_eq!(
        events,
        ["build installed-demo", "load tool-box installed-demo", "stop tool-box"]
    );
}

#[tokio::test]
async fn checkpoint_provider_gives_up_on_dead_sandbox() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alive"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let lifecycle = FakeLifecycle {
        url: server.uri(),
        ..Default::default()
    };
    let provider =
        CheckpointSandboxProvider::new(lifecycle, "box", "tag").alive_polling(2, Duration::ZERO);
    let err = provider.reset().await.unwrap_err();
    assert!(matches!(err, SandboxError::NotAlive { attempts: 2, .. }), "{err}");
    let events = provider.lifecycle().events.lock().unwrap().clone();
    assert_eq!(events.last().map(String::as_str), Some("stop box"));
}
