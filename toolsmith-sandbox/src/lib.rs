#![deny(missing_docs)]
//! The boundary between the orchestrator and an isolated sandbox.
//!
//! A [`Sandbox`] answers two requests: execute an action and report its
//! observation, or run a generated function and report its result. The
//! [`HttpSandbox`] client speaks the JSON-over-HTTP protocol served inside the
//! container; [`SandboxProvider`] hands out fresh sandboxes, and
//! [`CheckpointSandboxProvider`] does so by reloading a container checkpoint
//! through a [`ContainerLifecycle`].

pub mod client;
pub mod env;
pub mod error;
pub mod http;
pub mod provider;
pub mod records;

pub use client::Sandbox;
pub use env::{DEFAULT_ALLOWED_ENV_VARS, default_allowed, substitute_env_vars};
pub use error::SandboxError;
pub use http::HttpSandbox;
pub use provider::{
    CheckpointSandbox, CheckpointSandboxProvider, ContainerHandle, ContainerLifecycle,
    SandboxProvider,
};
pub use records::{
    CallStatus, FunctionArg, FunctionCall, FunctionCallResult, StatusResponse, ToolRunResult,
};
