//! Chat Completions message and request types.

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// Human turn.
    User,
    /// Model turn.
    Assistant,
    /// Result of a tool call.
    Tool,
}

/// One message of a conversation, in the OpenAI wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: Role,
    /// Text content. Absent for assistant messages that only call tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls requested by the assistant. `None` when there are none;
    /// never an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// The call this message answers (role `tool` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Assistant message with text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Tool result answering `call_id`.
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Text content, or the empty string.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Tool calls, or an empty slice.
    pub fn calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

/// A tool call requested by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, echoed back in the tool message.
    pub id: String,
    /// Always `"function"`.
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    /// Function name and JSON-encoded arguments.
    pub function: ToolFunction,
}

fn function_type() -> String {
    "function".into()
}

impl ToolCall {
    /// Function call with the given id, name and encoded arguments.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: ToolFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function part of a [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunction {
    /// Tool name.
    pub name: String,
    /// Arguments as a JSON string, exactly as the model produced them.
    pub arguments: String,
}

/// A tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

/// Requested shape of the assistant's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free text.
    Text,
    /// Any JSON object.
    JsonObject,
    /// JSON matching a schema.
    JsonSchema {
        /// Schema name.
        name: String,
        /// The JSON Schema.
        schema: Value,
        /// Enforce the schema strictly.
        strict: bool,
    },
}

impl ResponseFormat {
    /// Strict JSON-schema format.
    pub fn json_schema(name: impl Into<String>, schema: Value) -> Self {
        Self::JsonSchema {
            name: name.into(),
            schema,
            strict: true,
        }
    }

    /// Schema name, if this is a JSON-schema format.
    pub fn schema_name(&self) -> Option<&str> {
        match self {
            Self::JsonSchema { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A chat-completion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier. Providers fall back to their default when empty.
    pub model: String,
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Tools the model may call.
    pub tools: Vec<ToolSchema>,
    /// Requested reply shape.
    pub response_format: Option<ResponseFormat>,
}

/// A chat-completion response.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// The assistant message.
    pub message: ChatMessage,
    /// Token usage reported by the provider.
    pub usage: TokenUsage,
    /// Model that produced the reply.
    pub model: String,
}

/// Prompt and completion token counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u64,
    /// Tokens generated.
    pub completion_tokens: u64,
}

impl TokenUsage {
    /// Sum of both counts.
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_fields_are_not_serialized() {
        let msg = ChatMessage::user("hi");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"role": "user", "content": "hi"})
        );
    }

    #[test]
    fn tool_message_carries_call_id() {
        let msg = ChatMessage::tool("call_1", "{}");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_1");
    }

    #[test]
    fn tool_call_wire_shape() {
        let call = ToolCall::function("call_9", "read_file", r#"{"path":"/a"}"#);
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({
                "id": "call_9",
                "type": "function",
                "function": {"name": "read_file", "arguments": "{\"path\":\"/a\"}"}
            })
        );
    }

    #[test]
    fn assistant_message_without_content_parses() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{"id": "c", "type": "function", "function": {"name": "x", "arguments": "{}"}}]
        }))
        .unwrap();
        assert_eq!(msg.text(), "");
        assert_eq!(msg.calls().len(), 1);
    }

    #[test]
    fn usage_adds() {
        let mut total = TokenUsage::default();
        total += TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 2,
        };
        total += TokenUsage {
            prompt_tokens: 5,
            completion_tokens: 1,
        };
        assert_eq!(total.prompt_tokens, 15);
        assert_eq!(total.total_tokens(), 18);
    }
}
