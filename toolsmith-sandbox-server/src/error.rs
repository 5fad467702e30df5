//! Server error types.

use thiserror::Error;
use toolsmith_term::TermError;

/// Errors running a generated function.
///
/// A non-zero exit is not an error: it is reported as an error status in the
/// result. These variants mean the run could not be carried out or its
/// output contract was broken.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RunError {
    /// Preparing the function directory failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The runner command could not be built.
    #[error("could not build runner command: {0}")]
    Command(String),

    /// The runner process failed to run.
    #[error(transparent)]
    Term(#[from] TermError),

    /// The runner exited 0 without writing its output file.
    #[error("function runner exited 0 but wrote no output at {0}")]
    MissingOutput(String),

    /// The output file is not a `{"result": ...}` object.
    #[error("malformed function output: {0}")]
    MalformedOutput(String),
}

/// Errors starting or serving the sandbox server.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ServerError {
    /// Installing assets or binding the listener failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A log filter directive did not parse.
    #[error("invalid log filter: {0}")]
    LogFilter(String),
}
