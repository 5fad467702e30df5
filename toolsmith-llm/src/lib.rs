#![deny(missing_docs)]
//! Language-model access for toolsmith.
//!
//! [`Provider`] is the transport seam: one chat-completion request in, one
//! assistant message out. [`Llm`] wraps a provider with per-model token and
//! cost accounting, refuses calls that would push spend past a ceiling, and
//! retries transient failures. [`Llm::for_model`] hands out a [`Completion`]
//! bound to one model, which is what agents and pipelines call.

pub mod error;
pub mod ledger;
pub mod pricing;
pub mod provider;
pub mod types;

pub use error::LlmError;
pub use ledger::{Completion, Llm, ModelHandle, RetryPolicy};
pub use pricing::{ModelPrice, PricingTable};
pub use provider::{Provider, ProviderError};
pub use types::{
    ChatMessage, CompletionRequest, CompletionResponse, ResponseFormat, Role, TokenUsage,
    ToolCall, ToolFunction, ToolSchema,
};
pub use rust_decimal::Decimal;
