//! Cost-limited access to a provider.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::LlmError;
use crate::pricing::PricingTable;
use crate::provider::{Provider, ProviderError};
use crate::types::{
    ChatMessage, CompletionRequest, CompletionResponse, ResponseFormat, TokenUsage, ToolSchema,
};

/// Default spend ceiling in USD.
pub const DEFAULT_MAX_COST: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Bounded retry of transient provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait after a network or availability error.
    pub backoff: Duration,
    /// Wait after a rate-limit error.
    pub rate_limit_backoff: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn delay(&self, err: &ProviderError) -> Duration {
        match err {
            ProviderError::RateLimit { .. } => self.rate_limit_backoff,
            _ => self.backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
            rate_limit_backoff: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Default)]
struct Ledger {
    tokens: HashMap<String, TokenUsage>,
    cost: HashMap<String, Decimal>,
}

impl Ledger {
    fn total_cost(&self) -> Decimal {
        self.cost.values().copied().sum()
    }
}

/// A provider plus the usage ledger that guards it.
///
/// Every call is charged to the model it was made with. Before dispatch the
/// prompt cost is estimated at four characters per token; if that estimate
/// plus what has already been spent exceeds the ceiling, the call is refused.
pub struct Llm<P> {
    provider: P,
    pricing: PricingTable,
    max_cost: Decimal,
    retry: RetryPolicy,
    ledger: Mutex<Ledger>,
}

impl<P: Provider> Llm<P> {
    /// Wrap `provider` with the default pricing, a $5 ceiling and the default
    /// retry policy.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            pricing: PricingTable::default(),
            max_cost: DEFAULT_MAX_COST,
            retry: RetryPolicy::default(),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Set the spend ceiling.
    pub fn max_cost(mut self, max_cost: Decimal) -> Self {
        self.max_cost = max_cost;
        self
    }

    /// Replace the pricing table.
    pub fn pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    /// Replace the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// A [`Completion`] bound to `model`.
    pub fn for_model(&self, model: impl Into<String>) -> ModelHandle<'_, P> {
        ModelHandle {
            llm: self,
            model: model.into(),
        }
    }

    /// Charge, check and send one request.
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt_tokens = estimate_prompt_tokens(&request);
        let price = self.pricing.get(&request.model);
        if price.is_none() {
            tracing::warn!(model = %request.model, "no price known for model, charging nothing");
        }
        let estimated = price.map_or(Decimal::ZERO, |p| p.prompt_cost(prompt_tokens));
        let projected = estimated + self.total_cost();
        tracing::debug!(
            model = %request.model,
            prompt_tokens,
            estimated_cost = %estimated,
            "llm call"
        );
        if projected > self.max_cost {
            return Err(LlmError::CostLimitExceeded {
                projected,
                limit: self.max_cost,
            });
        }

        let model = request.model.clone();
        let response = self.send_with_retry(request).await?;

        let cost = price.map_or(Decimal::ZERO, |p| p.cost(response.usage));
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        *ledger.tokens.entry(model.clone()).or_default() += response.usage;
        *ledger.cost.entry(model.clone()).or_default() += cost;
        tracing::info!(
            model = %model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            cost = %cost,
            total_cost = %ledger.total_cost(),
            "llm call charged"
        );
        Ok(response)
    }

    async fn send_with_retry(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let mut attempt = 1;
        loop {
            match self.provider.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay(&err);
                    tracing::warn!(attempt, error = %err, delay = ?delay, "retrying llm call");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Spend so far, across models.
    pub fn total_cost(&self) -> Decimal {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .total_cost()
    }

    /// Spend so far on `model`.
    pub fn cost(&self, model: &str) -> Decimal {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cost
            .get(model)
            .copied()
            .unwrap_or_default()
    }

    /// Token usage so far on `model`.
    pub fn usage(&self, model: &str) -> TokenUsage {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
            .get(model)
            .copied()
            .unwrap_or_default()
    }

    /// Token usage so far, across models.
    pub fn total_usage(&self) -> TokenUsage {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
            .values()
            .fold(TokenUsage::default(), |acc, u| acc + *u)
    }
}

impl<P> std::fmt::Debug for Llm<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Llm")
            .field("cost", &ledger.total_cost())
            .field("max_cost", &self.max_cost)
            .finish()
    }
}

fn estimate_prompt_tokens(request: &CompletionRequest) -> u64 {
    let messages: usize = request
        .messages
        .iter()
        .map(|m| {
            m.text().chars().count()
                + m.calls()
                    .iter()
                    .map(|c| c.function.name.len() + c.function.arguments.chars().count())
                    .sum::<usize>()
        })
        .sum();
    let tools: usize = request
        .tools
        .iter()
        .map(|t| t.name.len() + t.description.chars().count() + t.parameters.to_string().len())
        .sum();
    ((messages + tools) as u64).div_ceil(4)
}

/// One-model view of a chat-completion backend.
///
/// This is what agents call; it keeps them independent of the provider type.
pub trait Completion: Send + Sync {
    /// Send `messages` with `tools` offered and return the assistant message.
    fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        response_format: Option<&ResponseFormat>,
    ) -> impl Future<Output = Result<ChatMessage, LlmError>> + Send;
}

/// [`Completion`] handle returned by [`Llm::for_model`].
pub struct ModelHandle<'a, P> {
    llm: &'a Llm<P>,
    model: String,
}

impl<P> ModelHandle<'_, P> {
    /// Model this handle calls.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl<P: Provider> Completion for ModelHandle<'_, P> {
    fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        response_format: Option<&ResponseFormat>,
    ) -> impl Future<Output = Result<ChatMessage, LlmError>> + Send {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            response_format: response_format.cloned(),
        };
        async move { Ok(self.llm.complete(request).await?.message) }
    }
}

impl<C: Completion> Completion for &C {
    fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
        response_format: Option<&ResponseFormat>,
    ) -> impl Future<Output = Result<ChatMessage, LlmError>> + Send {
        (**self).complete(messages, tools, response_format)
    }
}
