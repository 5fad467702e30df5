#![deny(missing_docs)]
//! HTTP sandbox server.
//!
//! Runs inside the container. Serves `GET /alive`, `POST /execute/{kind}`
//! (parse and execute one registered action) and `POST /run` (run a generated
//! function through the embedded Python runner). A single lock serializes
//! every request.

pub mod assets;
pub mod config;
pub mod error;
pub mod routes;
pub mod run;

pub use assets::{RUNNER_SCRIPT, SUBPROCESS_UTILS, install_assets};
pub use config::ServerConfig;
pub use error::{RunError, ServerError};
pub use routes::{AppState, router};
pub use run::run_function;
