//! Sandbox error type.

use thiserror::Error;

/// Errors at the sandbox boundary.
///
/// Expected action failures are not errors here: they come back as error
/// observations. These variants cover transport problems and broken
/// contracts.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The HTTP request could not be completed.
    #[error("sandbox request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body did not have the expected shape.
    #[error("could not decode sandbox response: {0}")]
    Decode(String),

    /// The sandbox violated the protocol (for example, `/run` answered with a
    /// non-success status).
    #[error("sandbox contract violated: {0}")]
    Contract(String),

    /// Building, loading or stopping a container failed.
    #[error("container lifecycle failed: {0}")]
    Lifecycle(String),

    /// The sandbox did not report alive in time.
    #[error("sandbox at {url} not alive after {attempts} attempts")]
    NotAlive {
        /// Base URL that was polled.
        url: String,
        /// Number of liveness checks made.
        attempts: u32,
    },
}
