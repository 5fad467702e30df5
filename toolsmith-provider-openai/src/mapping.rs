//! Request and response mapping between toolsmith types and the OpenAI
//! Chat Completions wire format.

use serde_json::{Value, json};
use toolsmith_llm::{
    ChatMessage, CompletionRequest, CompletionResponse, ProviderError, ResponseFormat, TokenUsage,
    ToolCall,
};

use crate::error;

/// Build the JSON body for a chat completions request.
pub(crate) fn to_api_request(req: &CompletionRequest, default_model: &str) -> Value {
    let model = if req.model.is_empty() {
        default_model
    } else {
        req.model.as_str()
    };
    let mut body = json!({
        "model": model,
        "messages": req.messages,
    });
    if !req.tools.is_empty() {
        body["tools"] = req
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    },
                })
            })
            .collect();
    }
    if let Some(format) = &req.response_format {
        body["response_format"] = map_response_format(format);
    }
    body
}

fn map_response_format(format: &ResponseFormat) -> Value {
    match format {
        ResponseFormat::Text => json!({ "type": "text" }),
        ResponseFormat::JsonObject => json!({ "type": "json_object" }),
        ResponseFormat::JsonSchema {
            name,
            schema,
            strict,
        } => json!({
            "type": "json_schema",
            "json_schema": {
                "name": name,
                "schema": schema,
                "strict": strict,
            },
        }),
    }
}

/// Parse a chat completions response body.
///
/// A structured-output request that comes back refused, filtered or cut
/// short is an error here, so callers never parse a partial document.
pub(crate) fn from_api_response(
    body: &Value,
    structured: bool,
) -> Result<CompletionResponse, ProviderError> {
    let model = body["model"].as_str().unwrap_or_default().to_string();
    let choice = body["choices"]
        .as_array()
        .and_then(|choices| choices.first())
        .ok_or_else(error::no_choices)?;
    let raw = &choice["message"];

    if let Some(reason) = raw["refusal"].as_str() {
        return Err(error::refused(reason));
    }
    match choice["finish_reason"].as_str() {
        Some("content_filter") => return Err(error::filtered()),
        Some("length") if structured => return Err(error::truncated_output()),
        _ => {}
    }

    let tool_calls = match raw["tool_calls"].as_array() {
        Some(calls) if !calls.is_empty() => Some(
            calls
                .iter()
                .enumerate()
                .map(|(index, call)| {
                    serde_json::from_value::<ToolCall>(call.clone())
                        .map_err(|e| error::malformed_tool_call(index, &e))
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        _ => None,
    };
    let mut bare = raw.clone();
    if let Some(fields) = bare.as_object_mut() {
        fields.remove("tool_calls");
    }
    let mut message: ChatMessage =
        serde_json::from_value(bare).map_err(|e| error::malformed_message(&e))?;
    message.tool_calls = tool_calls;

    let usage = TokenUsage {
        prompt_tokens: body["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: body["usage"]["completion_tokens"].as_u64().unwrap_or(0),
    };

    Ok(CompletionResponse {
        message,
        usage,
        model,
    })
}
