//! Errors from the ledger layer.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::provider::ProviderError;

/// Errors from [`crate::Llm`] calls.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider failed, after any retries.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The call was refused before dispatch because it would exceed the
    /// spend ceiling.
    #[error("cost limit exceeded: {projected:.3} > {limit:.3}")]
    CostLimitExceeded {
        /// Cost so far plus the estimated prompt cost of this call.
        projected: Decimal,
        /// Configured ceiling.
        limit: Decimal,
    },
}
