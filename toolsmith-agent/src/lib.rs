#![deny(missing_docs)]
//! The agent loop.
//!
//! An [`Agent`] sends the conversation in an [`AgentState`] to a model,
//! executes the actions it requests in a [`Sandbox`](toolsmith_sandbox::Sandbox),
//! feeds the observations back and stops once the model answers with a
//! [`Response`]. [`completion_step`] is the single-shot variant without tools.

pub mod agent;
pub mod error;
pub mod response;
pub mod state;

pub use agent::{Agent, DEFAULT_MAX_STEPS, completion_step};
pub use error::AgentError;
pub use response::Response;
pub use state::AgentState;
