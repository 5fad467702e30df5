//! Action error type.

use thiserror::Error;
use toolsmith_term::TermError;

/// Errors produced while parsing or executing an action.
///
/// [`ActionError::Failed`] is an expected failure whose message is meant for
/// the model (a missing file, a bad URL). Everything else is an unexpected
/// failure of the executor itself.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action ran but could not do what was asked.
    #[error("{0}")]
    Failed(String),

    /// Arguments did not match the action's schema.
    #[error("invalid arguments for `{kind}`: {message}")]
    InvalidArguments {
        /// Kind tag of the action being parsed.
        kind: String,
        /// Deserializer message.
        message: String,
    },

    /// No action is registered under this kind tag.
    #[error("unknown action `{0}`")]
    UnknownKind(String),

    /// The process runner failed.
    #[error(transparent)]
    Command(#[from] TermError),

    /// Filesystem error not covered by a specific failure message.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding JSON failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ActionError {
    /// Shorthand for [`ActionError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
