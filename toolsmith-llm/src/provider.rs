//! Provider trait for chat-completion backends.
//!
//! [`Provider`] uses RPITIT and is not object-safe. Callers stay generic over
//! the provider; [`crate::Completion`] is the seam the agent layer uses.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::types::{CompletionRequest, CompletionResponse};

/// Errors from chat-completion providers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    // Retryable errors
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Rate limited by the provider.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if provided by the API.
        retry_after: Option<Duration>,
    },
    /// Request timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Provider service is temporarily unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    // Terminal errors
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Malformed or invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Requested model does not exist.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// The provider answered with something that is not a completion.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether this error is likely transient and the request can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimit { .. } | Self::Timeout(_) | Self::ServiceUnavailable(_)
        )
    }
}

/// Chat-completion backend.
pub trait Provider: Send + Sync {
    /// Send one completion request.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ProviderError::RateLimit { retry_after: None }.is_retryable());
        assert!(ProviderError::ServiceUnavailable("502".into()).is_retryable());
        assert!(ProviderError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!ProviderError::Authentication("bad key".into()).is_retryable());
        assert!(!ProviderError::InvalidRequest("x".into()).is_retryable());
        assert!(!ProviderError::InvalidResponse("x".into()).is_retryable());
    }

    #[test]
    fn display() {
        assert_eq!(
            ProviderError::ModelNotFound("gpt-9".into()).to_string(),
            "model not found: gpt-9"
        );
    }
}
