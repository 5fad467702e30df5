//! Errors from spawning and draining subprocesses.

use thiserror::Error;

/// Errors from the process runner.
///
/// A non-zero exit status is not an error; it is reported through
/// [`CommandOutput::exit_code`](crate::CommandOutput::exit_code).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TermError {
    /// The shell could not be started.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// The command line that was being launched.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the output pipe failed.
    #[error("failed to read command output: {0}")]
    Read(#[source] std::io::Error),

    /// Waiting for the exit status failed.
    #[error("failed to wait for command: {0}")]
    Wait(#[source] std::io::Error),
}
