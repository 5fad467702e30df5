//! Turning OpenAI failures into [`ProviderError`].
//!
//! Non-2xx bodies carry `{"error": {"message", "type", "param", "code"}}`.
//! The `code` and `param` fields decide which rejection the caller sees;
//! bodies outside that envelope are reported verbatim.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;
use toolsmith_llm::ProviderError;

/// Longest slice of an unparseable body quoted in an error.
const BODY_EXCERPT: usize = 200;

/// The `error` object of a failed API call.
#[derive(Debug, Default, PartialEq)]
struct ApiError {
    message: String,
    code: Option<String>,
    param: Option<String>,
}

impl ApiError {
    fn parse(body: &str) -> Self {
        let Ok(json) = serde_json::from_str::<Value>(body) else {
            return Self {
                message: excerpt(body),
                ..Self::default()
            };
        };
        let error = &json["error"];
        let field = |name: &str| error[name].as_str().map(str::to_owned);
        Self {
            message: field("message").unwrap_or_else(|| excerpt(body)),
            code: field("code").or_else(|| field("type")),
            param: field("param"),
        }
    }

    fn describe(&self) -> String {
        match &self.code {
            Some(code) => format!("{code}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

/// Classify a non-2xx reply from the chat completions endpoint.
pub(crate) fn from_status(status: StatusCode, headers: &HeaderMap, body: &str) -> ProviderError {
    let api = ApiError::parse(body);
    match status.as_u16() {
        401 | 403 => ProviderError::Authentication(api.describe()),
        404 => ProviderError::ModelNotFound(api.message),
        // An empty balance does not recover by waiting.
        429 if api.code.as_deref() == Some("insufficient_quota") => {
            ProviderError::Authentication(format!("quota exhausted: {}", api.message))
        }
        429 => ProviderError::RateLimit {
            retry_after: retry_after(headers).or_else(|| try_again_hint(&api.message)),
        },
        400 | 422 => rejected(api),
        500 | 502 | 503 | 504 => ProviderError::ServiceUnavailable(api.describe()),
        _ => ProviderError::InvalidRequest(format!("HTTP {status}: {}", api.describe())),
    }
}

/// A 400 names the part of the request it refused in `param`.
fn rejected(api: ApiError) -> ProviderError {
    let param = api.param.as_deref().unwrap_or_default();
    let text = if api.code.as_deref() == Some("context_length_exceeded") {
        format!("conversation exceeds the model context window: {}", api.message)
    } else if param.starts_with("response_format") {
        format!("response schema refused: {}", api.message)
    } else if param.starts_with("tools") {
        format!("tool schema `{param}` refused: {}", api.message)
    } else if param.starts_with("messages") {
        format!("conversation history `{param}` refused: {}", api.message)
    } else {
        api.describe()
    };
    ProviderError::InvalidRequest(text)
}

/// `retry-after-ms` wins over `retry-after` (whole or fractional seconds).
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value >= 0.0)
    };
    header("retry-after-ms")
        .map(millis)
        .or_else(|| header("retry-after").map(|secs| millis(secs * 1000.0)))
}

fn millis(ms: f64) -> Duration {
    Duration::from_nanos((ms * 1_000_000.0).round() as u64)
}

/// Rate-limit messages end with "Please try again in 1.5s." or "in 120ms.".
fn try_again_hint(message: &str) -> Option<Duration> {
    let rest = &message[message.find("try again in ")? + "try again in ".len()..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    let amount: f64 = rest[..end].parse().ok()?;
    let unit = &rest[end..];
    if unit.starts_with("ms") {
        Some(millis(amount))
    } else if unit.starts_with('s') {
        Some(millis(amount * 1000.0))
    } else {
        None
    }
}

/// Transport failure. `timeout` is the per-request limit that was in force.
pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Network(Box::new(err))
    }
}

/// A 2xx reply whose body is not JSON (proxies, captive portals).
pub(crate) fn unreadable_body(err: &serde_json::Error, body: &str) -> ProviderError {
    ProviderError::InvalidResponse(format!(
        "body is not JSON ({err}): {}",
        excerpt(body)
    ))
}

/// A reply without any choice to read a message from.
pub(crate) fn no_choices() -> ProviderError {
    ProviderError::InvalidResponse("reply has no choices".into())
}

/// Structured output was refused; `content` is null and `refusal` says why.
pub(crate) fn refused(reason: &str) -> ProviderError {
    ProviderError::InvalidResponse(format!("model refused the response schema: {reason}"))
}

/// The completion was withheld by the moderation layer.
pub(crate) fn filtered() -> ProviderError {
    ProviderError::InvalidResponse("completion withheld by the content filter".into())
}

/// Structured output stopped at the token limit, so the JSON is incomplete.
pub(crate) fn truncated_output() -> ProviderError {
    ProviderError::InvalidResponse("structured output cut off at the token limit".into())
}

/// One entry of `tool_calls` does not fit the function-call shape.
pub(crate) fn malformed_tool_call(index: usize, err: &serde_json::Error) -> ProviderError {
    ProviderError::InvalidResponse(format!("tool call #{index} is malformed: {err}"))
}

/// The assistant message itself does not deserialize.
pub(crate) fn malformed_message(err: &serde_json::Error) -> ProviderError {
    ProviderError::InvalidResponse(format!("assistant message is malformed: {err}"))
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn envelope(message: &str, code: Option<&str>, param: Option<&str>) -> String {
        json!({"error": {"message": message, "type": "invalid_request_error", "param": param, "code": code}})
            .to_string()
    }

    fn status(code: StatusCode, body: &str) -> ProviderError {
        from_status(code, &HeaderMap::new(), body)
    }

    #[test]
    fn envelope_fields_are_read() {
        let api = ApiError::parse(&envelope("Incorrect API key provided", Some("invalid_api_key"), None));
        assert_eq!(api.message, "Incorrect API key provided");
        assert_eq!(api.code.as_deref(), Some("invalid_api_key"));
        assert_eq!(api.describe(), "invalid_api_key: Incorrect API key provided");

        let plain = ApiError::parse("upstream connect error");
        assert_eq!(plain.describe(), "upstream connect error");
    }

    #[test]
    fn bad_key_is_authentication() {
        let err = status(
            StatusCode::UNAUTHORIZED,
            &envelope("Incorrect API key provided", Some("invalid_api_key"), None),
        );
        assert!(matches!(&err, ProviderError::Authentication(m) if m.starts_with("invalid_api_key")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn unknown_model_keeps_the_api_message() {
        let err = status(
            StatusCode::NOT_FOUND,
            &envelope("The model `gpt-9` does not exist", Some("model_not_found"), Some("model")),
        );
        assert_eq!(err.to_string(), "model not found: The model `gpt-9` does not exist");
    }

    #[test]
    fn schema_rejection_names_the_response_format() {
        let err = status(
            StatusCode::BAD_REQUEST,
            &envelope(
                "Invalid schema for response_format 'Assessment': 'required' is missing",
                Some("invalid_json_schema"),
                Some("response_format"),
            ),
        );
        assert!(matches!(&err, ProviderError::InvalidRequest(m) if m.starts_with("response schema refused")));
    }

    #[test]
    fn tool_and_history_rejections_name_the_param() {
        let tools = status(
            StatusCode::BAD_REQUEST,
            &envelope("Invalid 'tools[2].function.name'", None, Some("tools[2].function.name")),
        );
        assert!(tools.to_string().contains("`tools[2].function.name`"));

        let history = status(
            StatusCode::BAD_REQUEST,
            &envelope(
                "An assistant message with 'tool_calls' must be followed by tool messages",
                None,
                Some("messages.[3].role"),
            ),
        );
        assert!(history.to_string().contains("conversation history `messages.[3].role`"));
    }

    #[test]
    fn context_overflow_is_terminal() {
        let err = status(
            StatusCode::BAD_REQUEST,
            &envelope("This model's maximum context length is 128000 tokens", Some("context_length_exceeded"), Some("messages")),
        );
        assert!(err.to_string().contains("context window"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn rate_limit_prefers_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("7"));
        let body = envelope("Rate limit reached. Please try again in 20s.", Some("rate_limit_exceeded"), None);
        assert!(matches!(
            from_status(StatusCode::TOO_MANY_REQUESTS, &headers, &body),
            ProviderError::RateLimit { retry_after: Some(d) } if d == Duration::from_secs(7)
        ));

        headers.insert("retry-after-ms", HeaderValue::from_static("250"));
        assert!(matches!(
            from_status(StatusCode::TOO_MANY_REQUESTS, &headers, &body),
            ProviderError::RateLimit { retry_after: Some(d) } if d == Duration::from_millis(250)
        ));
    }

    #[test]
    fn rate_limit_falls_back_to_message_hint() {
        let body = envelope("Rate limit reached. Please try again in 1.5s.", Some("rate_limit_exceeded"), None);
        assert!(matches!(
            status(StatusCode::TOO_MANY_REQUESTS, &body),
            ProviderError::RateLimit { retry_after: Some(d) } if d == Duration::from_millis(1500)
        ));
        assert_eq!(try_again_hint("Please try again in 120ms."), Some(Duration::from_millis(120)));
        assert!(matches!(
            status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            ProviderError::RateLimit { retry_after: None }
        ));
    }

    #[test]
    fn empty_quota_is_not_retried() {
        let err = status(
            StatusCode::TOO_MANY_REQUESTS,
            &envelope("You exceeded your current quota", Some("insufficient_quota"), None),
        );
        assert!(matches!(&err, ProviderError::Authentication(m) if m.starts_with("quota exhausted")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_side_failures_are_retryable() {
        for code in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ] {
            let err = status(code, "The server is overloaded");
            assert!(matches!(err, ProviderError::ServiceUnavailable(_)));
            assert!(err.is_retryable());
        }
        assert!(matches!(
            status(StatusCode::IM_A_TEAPOT, "short and stout"),
            ProviderError::InvalidRequest(m) if m.starts_with("HTTP 418")
        ));
    }

    #[test]
    fn long_bodies_are_cut() {
        let body = "x".repeat(BODY_EXCERPT * 2);
        let err = serde_json::from_str::<Value>(&body).unwrap_err();
        let message = unreadable_body(&err, &body).to_string();
        assert!(message.ends_with("..."));
        assert!(message.len() < body.len());
    }
}
