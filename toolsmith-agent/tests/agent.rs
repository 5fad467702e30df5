//! Agent loop tests with a scripted model and a stub sandbox.

use std::collections::VecDeque;
use std::sync::Mutex;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use toolsmith_action::{AnyAction, Observation};
use toolsmith_agent::{Agent, AgentError, AgentState, Response, completion_step};
use toolsmith_llm::{ChatMessage, Completion, LlmError, ResponseFormat, Role, ToolCall, ToolSchema};
use toolsmith_sandbox::{FunctionCall, FunctionCallResult, Sandbox, SandboxError};

/// What the model saw on one call.
#[derive(Debug, Clone)]
struct Seen {
    messages: usize,
    tools: Vec<String>,
    format: Option<ResponseFormat>,
}

#[derive(Default)]
struct ScriptedModel {
    replies: Mutex<VecDeque<ChatMessage>>,
    seen: Mutex<Vec<Seen>>,
}

impl ScriptedModel {
    fn new(replies: impl IntoIterator<Item = ChatMessage>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        }
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

impl Completion for ScriptedModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        response_format: Option<&ResponseFormat>,
    ) -> Result<ChatMessage, LlmError> {
        self.seen.lock().unwrap().push(Seen {
            messages: messages.len(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
            format: response_format.cloned(),
        });
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no more scripted replies"))
    }
}

/// Answers every action with a fixed observation, or fails.
#[derive(Default)]
struct StubSandbox {
    observation: Option<Observation>,
    executed: Mutex<Vec<String>>,
}

impl StubSandbox {
    fn answering(observation: Observation) -> Self {
        Self {
            observation: Some(observation),
            ..Default::default()
        }
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl Sandbox for StubSandbox {
    async fn execute(&self, action: &dyn AnyAction) -> Result<Observation, SandboxError> {
        self.executed.lock().unwrap().push(action.bash());
        self.observation
            .clone()
            .ok_or_else(|| SandboxError::Contract("connection reset".into()))
    }

    async fn run_function(&self, _call: &FunctionCall) -> Result<FunctionCallResult, SandboxError> {
        unreachable!("the agent never runs functions")
    }

    async fn stop(&self) -> Result<(), SandboxError> {
        Ok(())
    }
}

fn calls(calls: Vec<ToolCall>) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: None,
        tool_calls: Some(calls),
        tool_call_id: None,
    }
}

fn bash_call(id: &str, command: &str) -> ToolCall {
    ToolCall::function(
        id,
        "run_bash_command",
        json!({"reasoning": "look", "command": command, "env": []}).to_string(),
    )
}

fn user(text: &str) -> AgentState<()> {
    AgentState::new(()).append_message(ChatMessage::user(text))
}

#[tokio::test]
async fn step_executes_calls_and_answers_each_by_id() {
    let model = ScriptedModel::new([calls(vec![bash_call("c1", "ls"), bash_call("c2", "pwd")])]);
    let sandbox = StubSandbox::answering(Observation::text("ok"));
    let agent = Agent::new(&model);

    let state = agent.step::<String, _, _>(user("go"), &sandbox).await.unwrap();

    assert!(state.response().is_none());
    assert_eq!(sandbox.executed(), ["ls", "pwd"]);
    let messages = state.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].role, Role::Tool);
    assert_eq!(messages[2].tool_call_id.as_deref(), Some("c1"));
    assert_eq!(messages[3].tool_call_id.as_deref(), Some("c2"));
    assert_eq!(messages[3].text(), r#"{"content":"ok"}"#);
    assert_eq!(state.actions().len(), 2);
}

#[tokio::test]
async fn empty_tool_call_list_is_cleared_and_text_becomes_response() {
    let mut reply = ChatMessage::assistant("All done.");
    reply.tool_calls = Some(Vec::new());
    let model = ScriptedModel::new([reply]);
    let agent = Agent::new(&model);

    let state = agent
        .step::<String, _, _>(user("go"), &StubSandbox::default())
        .await
        .unwrap();

    assert_eq!(state.response().as_deref(), Some("All done."));
    let last = state.messages().last().unwrap();
    assert!(last.tool_calls.is_none());
    assert!(model.seen()[0].format.is_none());
}

#[tokio::test]
async fn unknown_tool_and_bad_arguments_become_error_observations() {
    let model = ScriptedModel::new([calls(vec![
        ToolCall::function("c1", "fly", "{}"),
        ToolCall::function("c2", "read_file", r#"{"path": "/a", "mode": "rb"}"#),
        ToolCall::function("c3", "read_file", "{not json"),
    ])]);
    let sandbox = StubSandbox::answering(Observation::text("unused"));
    let agent = Agent::new(&model);

    let state = agent.step::<String, _, _>(user("go"), &sandbox).await.unwrap();

    assert!(sandbox.executed().is_empty());
    assert!(state.actions().is_empty());
    for message in &state.messages()[2..] {
        let body: serde_json::Value = serde_json::from_str(message.text()).unwrap();
        assert_eq!(body["content"], toolsmith_action::ERROR_CONTENT);
        assert!(body["error"].is_string());
    }
    assert!(state.messages()[2].text().contains("fly"));
}

#[tokio::test]
async fn sandbox_failure_becomes_error_observation() {
    let model = ScriptedModel::new([calls(vec![bash_call("c1", "ls")])]);
    let agent = Agent::new(&model);

    let state = agent
        .step::<String, _, _>(user("go"), &StubSandbox::default())
        .await
        .unwrap();

    let (_, observation) = &state.actions()[0];
    assert!(observation.is_error());
    let error = observation.field("error").and_then(|e| e.as_str()).unwrap();
    assert!(error.contains("connection reset"), "{error}");
}

#[tokio::test]
async fn long_observations_are_truncated_unless_exempt() {
    let long = "x".repeat(20_000);
    let model = ScriptedModel::new([calls(vec![
        bash_call("c1", "cat big.log"),
        ToolCall::function("c2", "read_file", r#"{"path": "/w/README.md"}"#),
    ])]);
    let sandbox = StubSandbox::answering(Observation::text(long.clone()));
    let agent = Agent::new(&model);

    let state = agent.step::<String, _, _>(user("go"), &sandbox).await.unwrap();

    let bash = state.actions()[0].1.content.as_str().unwrap();
    assert!(bash.contains("<truncated/>"));
    assert!(bash.len() < long.len());
    assert_eq!(state.actions()[1].1.content.as_str(), Some(long.as_str()));
}

#[tokio::test]
async fn run_stops_at_first_response() {
    let model = ScriptedModel::new([
        calls(vec![bash_call("c1", "ls")]),
        ChatMessage::assistant("The repo has a README."),
    ]);
    let sandbox = StubSandbox::answering(Observation::text("README.md"));
    let agent = Agent::new(&model).without("write_file");

    let state: AgentState<String> = agent.run(user("explore"), &sandbox).await.unwrap();

    assert_eq!(state.response(), "The repo has a README.");
    let seen = model.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].messages, 3);
    assert!(!seen[0].tools.contains(&"write_file".to_string()));
    assert!(seen[0].tools.contains(&"read_file".to_string()));
}

#[tokio::test]
async fn run_fails_when_steps_run_out() {
    let model = ScriptedModel::new([
        calls(vec![bash_call("c1", "ls")]),
        calls(vec![bash_call("c2", "ls")]),
    ]);
    let sandbox = StubSandbox::answering(Observation::text("."));
    let agent = Agent::new(&model).max_steps(2);

    let err = agent
        .run::<String, _, _>(user("go"), &sandbox)
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::StepsExhausted(2)), "{err}");
    assert_eq!(err.to_string(), "agent has exhausted its maximum number of steps (2)");
}

/// Where the repository was installed.
#[derive(Debug, Deserialize, JsonSchema)]
struct Installed {
    path: String,
    summary: String,
}

impl Response for Installed {}

#[tokio::test]
async fn structured_response_is_requested_and_parsed() {
    let model = ScriptedModel::new([ChatMessage::assistant(
        r#"{"path": "/workspace/demo", "summary": "pip install -e ."}"#,
    )]);
    let agent = Agent::new(&model);

    let state: AgentState<Installed> = agent
        .run(user("install"), &StubSandbox::default())
        .await
        .unwrap();

    assert_eq!(state.response().path, "/workspace/demo");
    assert_eq!(state.response().summary, "pip install -e .");
    let format = model.seen()[0].format.clone().unwrap();
    assert_eq!(format.schema_name(), Some("Installed"));
}

#[tokio::test]
async fn unparseable_structured_response_is_fatal() {
    let model = ScriptedModel::new([ChatMessage::assistant("It is installed.")]);
    let agent = Agent::new(&model);

    let err = agent
        .run::<Installed, _, _>(user("install"), &StubSandbox::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Response(_)), "{err}");
}

#[tokio::test]
async fn completion_step_appends_reply_without_tools() {
    let model = ScriptedModel::new([ChatMessage::assistant("1. Load the model\n2. Predict")]);

    let state: AgentState<String> = completion_step(user("plan"), &model).await.unwrap();

    assert_eq!(state.response(), "1. Load the model\n2. Predict");
    assert_eq!(state.messages().len(), 2);
    assert_eq!(state.messages()[1].role, Role::Assistant);
    assert!(model.seen()[0].tools.is_empty());
}
