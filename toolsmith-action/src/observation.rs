//! Observations and truncation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default truncation limit, in characters.
pub const DEFAULT_MAX_LENGTH: usize = 15_000;

/// Content of every [`ErrorObservation`].
pub const ERROR_CONTENT: &str = "An error occurred while calling the function.";

/// Result of executing an action.
///
/// `content` holds the main payload (text, a list, or `null`); any
/// kind-specific fields such as `return_code` or `filename` are kept in
/// `fields` and serialized inline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Observation {
    /// The content of the observation.
    #[serde(default)]
    pub content: Value,
    /// Additional kind-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Observation {
    /// Observation with text content and no extra fields.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Value::String(content.into()),
            fields: Map::new(),
        }
    }

    /// Convert any serializable observation into the generic shape.
    pub fn from_typed<T: Serialize>(typed: &T) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(typed)?)
    }

    /// Look up a kind-specific field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Whether this is the error-observation shape.
    pub fn is_error(&self) -> bool {
        self.fields.contains_key("error") && self.content.as_str() == Some(ERROR_CONTENT)
    }
}

/// Observation returned when an action fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorObservation {
    /// Always [`ERROR_CONTENT`].
    #[serde(default = "error_content")]
    pub content: String,
    /// What went wrong.
    pub error: String,
}

fn error_content() -> String {
    ERROR_CONTENT.to_string()
}

impl ErrorObservation {
    /// Create an error observation with the given message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            content: error_content(),
            error: error.into(),
        }
    }
}

impl From<ErrorObservation> for Observation {
    fn from(err: ErrorObservation) -> Self {
        let mut fields = Map::new();
        fields.insert("error".into(), Value::String(err.error));
        Self {
            content: Value::String(err.content),
            fields,
        }
    }
}

/// Truncate an observation's content to `max_length` characters.
///
/// Non-string content is JSON-encoded before measuring. Content that already
/// fits is returned untouched, keeping its original type.
pub fn truncate(observation: Observation, max_length: usize) -> Observation {
    let truncated = match &observation.content {
        Value::String(s) => exceeds(s, max_length).then(|| truncate_str(s, max_length)),
        other => {
            let encoded = other.to_string();
            exceeds(&encoded, max_length).then(|| truncate_str(&encoded, max_length))
        }
    };
    match truncated {
        Some(content) => Observation {
            content: Value::String(content),
            ..observation
        },
        None => observation,
    }
}

fn exceeds(s: &str, max_length: usize) -> bool {
    s.chars().count() > max_length
}

/// Keep the first and last `max_length / 2` characters of `s`.
///
/// Strings within the limit are returned as-is.
pub fn truncate_str(s: &str, max_length: usize) -> String {
    let len = s.chars().count();
    if len <= max_length {
        return s.to_string();
    }
    let half = max_length / 2;
    let head: String = s.chars().take(half).collect();
    let tail: String = s.chars().skip(len - half).collect();
    format!(
        "NOTE: The following content had to be truncated because its length ({len}) exceeds the maximum character length ({max_length}). Thus, the middle part of the content is omitted. Below is the content (between the <content> and </content> tags, with the truncated part replaced with <truncated/>):\n<content>\n{head}\n<truncated/>\n{tail}\n</content>\n"
    )
}
