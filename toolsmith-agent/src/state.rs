//! Immutable agent state.

use std::sync::Arc;

use toolsmith_action::{AnyAction, Observation};
use toolsmith_llm::ChatMessage;

/// Conversation, action trail and response of an agent.
///
/// Every transition consumes the state and returns a new one. Keeping a
/// clone of an earlier state is how callers checkpoint and rewind.
#[derive(Debug, Clone)]
pub struct AgentState<T> {
    messages: Vec<ChatMessage>,
    actions: Vec<(Arc<dyn AnyAction>, Observation)>,
    response: T,
}

impl<T> AgentState<T> {
    /// Empty conversation carrying `response`.
    pub fn new(response: T) -> Self {
        Self {
            messages: Vec::new(),
            actions: Vec::new(),
            response,
        }
    }

    /// Messages so far, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Executed actions with their observations, oldest first.
    pub fn actions(&self) -> &[(Arc<dyn AnyAction>, Observation)] {
        &self.actions
    }

    /// The response.
    pub fn response(&self) -> &T {
        &self.response
    }

    /// Consume the state, keeping only the response.
    pub fn into_response(self) -> T {
        self.response
    }

    /// Append one message.
    pub fn append_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Append several messages.
    pub fn append_messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Record an executed action.
    pub fn append_action(mut self, action: Arc<dyn AnyAction>, observation: Observation) -> Self {
        self.actions.push((action, observation));
        self
    }

    /// Clear the action trail, keeping the conversation.
    pub fn reset_actions(mut self) -> Self {
        self.actions.clear();
        self
    }

    /// Replace the response.
    pub fn with_response<U>(self, response: U) -> AgentState<U> {
        AgentState {
            messages: self.messages,
            actions: self.actions,
            response,
        }
    }

    /// Transform the response.
    pub fn map_response<U>(self, f: impl FnOnce(T) -> U) -> AgentState<U> {
        AgentState {
            messages: self.messages,
            actions: self.actions,
            response: f(self.response),
        }
    }

    /// The action trail as a shell script.
    ///
    /// Each step is preceded by its reasoning and followed by its
    /// observation. Actions without side effects are commented out.
    pub fn bash(&self) -> String {
        self.actions
            .iter()
            .enumerate()
            .map(|(i, (action, observation))| {
                let prefix = if action.side_effect() { "" } else { "# " };
                let observation = serde_json::to_string(observation).unwrap_or_default();
                format!(
                    "# Step {i}: {}\n{prefix}{}\n# observation: {}\n",
                    one_line(action.reasoning()),
                    action.bash(),
                    one_line(&observation),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<T> AgentState<Option<T>> {
    /// Unwrap a present response, or give the state back.
    pub fn completed(self) -> Result<AgentState<T>, Self> {
        match self.response {
            Some(response) => Ok(AgentState {
                messages: self.messages,
                actions: self.actions,
                response,
            }),
            None => Err(self),
        }
    }
}

impl<T: Default> Default for AgentState<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

fn one_line(s: &str) -> String {
    s.replace('\n', " ").replace('\r', "")
}
