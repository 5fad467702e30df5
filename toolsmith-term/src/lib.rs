#![deny(missing_docs)]
//! Terminal-capturing process runner.
//!
//! [`run_command`] executes one shell command with standard input closed and
//! feeds its combined output through a virtual terminal. The result is the
//! final visual state of that terminal rather than the raw byte stream, so
//! progress bars and carriage-return redraws collapse into a single line and
//! the transcript stays bounded.

pub mod error;
pub mod runner;
pub mod transcript;

pub use error::TermError;
pub use runner::{CommandOptions, CommandOutput, run_command};
pub use transcript::{EOF_HINT, Transcript};
