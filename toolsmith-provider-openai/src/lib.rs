//! OpenAI Chat Completions provider for toolsmith.
//!
//! ```no_run
//! use toolsmith_provider_openai::OpenAi;
//!
//! let provider = OpenAi::new("your-api-key").model("gpt-4o");
//! ```
//!
//! Tool calls, tool results and `response_format` JSON schemas are passed
//! through in the wire shape. HTTP status codes are mapped onto
//! [`ProviderError`] variants so the ledger can tell transient failures from
//! terminal ones.

pub mod client;
pub(crate) mod error;
pub(crate) mod mapping;

pub use client::OpenAi;

pub use toolsmith_llm::ProviderError;
