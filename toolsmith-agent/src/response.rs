//! Typed model responses.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use toolsmith_action::schema::function_schema_for;
use toolsmith_llm::ResponseFormat;

use crate::error::AgentError;

/// A value the model answers with.
///
/// Structured types get a strict JSON-schema response format derived from
/// their schemars schema and are parsed from the reply as JSON; an empty
/// `impl Response for MyType {}` is enough. `String` takes the reply text
/// as-is and requests no format.
pub trait Response: DeserializeOwned + JsonSchema + Send + Sync + Sized {
    /// Reply format to request from the model.
    fn response_format() -> Option<ResponseFormat> {
        let name = Self::schema_name();
        let schema = function_schema_for::<Self>(&name).parameters;
        Some(ResponseFormat::json_schema(name, schema))
    }

    /// Parse the reply text.
    fn parse(content: &str) -> Result<Self, AgentError> {
        serde_json::from_str(content).map_err(|e| AgentError::Response(e.to_string()))
    }
}

impl Response for String {
    fn response_format() -> Option<ResponseFormat> {
        None
    }

    fn parse(content: &str) -> Result<Self, AgentError> {
        Ok(content.to_string())
    }
}
