//! The agent loop.

use std::sync::Arc;

use serde_json::{Map, Value};
use toolsmith_action::{
    ActionRegistry, AnyAction, DEFAULT_MAX_LENGTH, ErrorObservation, Observation, truncate,
};
use toolsmith_llm::{ChatMessage, Completion, ToolCall, ToolSchema};
use toolsmith_sandbox::Sandbox;

use crate::error::AgentError;
use crate::response::Response;
use crate::state::AgentState;

/// Default step budget for [`Agent::run`].
pub const DEFAULT_MAX_STEPS: usize = 40;

/// Drives a model through tool calls against a sandbox.
///
/// ```no_run
/// # async fn demo<C: toolsmith_llm::Completion, S: toolsmith_sandbox::Sandbox>(
/// #     completion: C, sandbox: S,
/// # ) -> Result<(), toolsmith_agent::AgentError> {
/// use toolsmith_agent::{Agent, AgentState};
/// use toolsmith_llm::ChatMessage;
///
/// let agent = Agent::new(completion).without("write_file");
/// let state = AgentState::new(()).append_message(ChatMessage::user("Explore the repo."));
/// let summary: AgentState<String> = agent.run(state, &sandbox).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Agent<C> {
    completion: C,
    registry: ActionRegistry,
    tools: Vec<ToolSchema>,
    max_steps: usize,
}

impl<C: Completion> Agent<C> {
    /// Agent offering every action in the process-wide table, as
    /// registered at construction time.
    pub fn new(completion: C) -> Self {
        Self::with_registry(completion, toolsmith_action::registered())
    }

    /// Agent offering the actions in `registry`.
    pub fn with_registry(completion: C, registry: ActionRegistry) -> Self {
        let tools = tool_schemas(&registry);
        Self {
            completion,
            registry,
            tools,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Stop offering the action `kind`.
    pub fn without(self, kind: &str) -> Self {
        let registry = self.registry.without(kind);
        Self {
            tools: tool_schemas(&registry),
            registry,
            ..self
        }
    }

    /// Step budget for [`Agent::run`].
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Tools offered to the model.
    pub fn tools(&self) -> &[ToolSchema] {
        &self.tools
    }

    /// One model turn plus the actions it requests.
    ///
    /// The assistant message is appended as returned, except that an empty
    /// tool-call list is cleared. Each call is answered by a tool message
    /// carrying the observation; calls that fail to parse or execute are
    /// answered with an error observation and the loop carries on. The
    /// response is set when the model replied without calling tools.
    pub async fn step<T: Response, U, S: Sandbox>(
        &self,
        state: AgentState<U>,
        sandbox: &S,
    ) -> Result<AgentState<Option<T>>, AgentError> {
        let format = T::response_format();
        let mut message = self
            .completion
            .complete(state.messages(), &self.tools, format.as_ref())
            .await?;
        if message.tool_calls.as_ref().is_some_and(Vec::is_empty) {
            message.tool_calls = None;
        }

        let calls = message.calls().to_vec();
        let response = match (&message.content, calls.is_empty()) {
            (Some(content), true) => Some(T::parse(content)?),
            _ => None,
        };
        let mut state = state.append_message(message);

        for call in &calls {
            let (action, observation) = self.dispatch(call, sandbox).await;
            let content = serde_json::to_string(&observation)?;
            state = state.append_message(ChatMessage::tool(&call.id, content));
            if let Some(action) = action {
                state = state.append_action(action, observation);
            }
        }

        Ok(state.with_response(response))
    }

    /// Step until the model responds.
    ///
    /// Any response already in `state` is discarded first. Fails with
    /// [`AgentError::StepsExhausted`] after the step budget.
    pub async fn run<T: Response, U, S: Sandbox>(
        &self,
        state: AgentState<U>,
        sandbox: &S,
    ) -> Result<AgentState<T>, AgentError> {
        let mut state = state.with_response(None::<T>);
        for step in 0..self.max_steps {
            tracing::debug!(step, max_steps = self.max_steps, "agent step");
            state = match self.step(state, sandbox).await?.completed() {
                Ok(done) => return Ok(done),
                Err(pending) => pending,
            };
        }
        tracing::warn!(max_steps = self.max_steps, "agent ran out of steps");
        Err(AgentError::StepsExhausted(self.max_steps))
    }

    async fn dispatch<S: Sandbox>(
        &self,
        call: &ToolCall,
        sandbox: &S,
    ) -> (Option<Arc<dyn AnyAction>>, Observation) {
        let name = &call.function.name;
        let arguments = match parse_arguments(&call.function.arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                tracing::debug!(tool = %name, error = %e, "malformed tool arguments");
                let message = format!("invalid arguments for `{name}`: {e}");
                return (None, ErrorObservation::new(message).into());
            }
        };
        let action = match self.registry.parse(name, arguments) {
            Ok(action) => action,
            Err(e) => {
                tracing::debug!(tool = %name, error = %e, "rejected tool call");
                return (None, ErrorObservation::new(e.to_string()).into());
            }
        };

        tracing::info!(kind = action.kind(), command = %action.bash(), "executing action");
        let observation = match sandbox.execute(action.as_ref()).await {
            Ok(observation) => observation,
            Err(e) => {
                tracing::warn!(kind = action.kind(), error = %e, "sandbox request failed");
                ErrorObservation::new(e.to_string()).into()
            }
        };
        let observation = if action.may_truncate() {
            truncate(observation, DEFAULT_MAX_LENGTH)
        } else {
            observation
        };
        (Some(action), observation)
    }
}

fn parse_arguments(arguments: &str) -> Result<Value, serde_json::Error> {
    if arguments.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(arguments)
}

fn tool_schemas(registry: &ActionRegistry) -> Vec<ToolSchema> {
    registry
        .function_schemas()
        .into_iter()
        .map(|schema| ToolSchema {
            name: schema.name,
            description: schema.description,
            parameters: schema.parameters,
        })
        .collect()
}

/// Single-shot exchange without tools.
///
/// Sends the conversation with `T`'s response format, appends the reply as
/// an assistant message and sets it as the response.
pub async fn completion_step<T: Response, U, C: Completion>(
    state: AgentState<U>,
    completion: &C,
) -> Result<AgentState<T>, AgentError> {
    let format = T::response_format();
    let message = completion
        .complete(state.messages(), &[], format.as_ref())
        .await?;
    let content = message.text().to_string();
    let response = T::parse(&content)?;
    Ok(state
        .append_message(ChatMessage::assistant(content))
        .with_response(response))
}
