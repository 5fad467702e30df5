//! Per-model token prices.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::types::TokenUsage;

/// USD price per one million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPrice {
    /// Prompt tokens.
    pub prompt: Decimal,
    /// Completion tokens.
    pub completion: Decimal,
}

impl ModelPrice {
    /// Price from cents per million tokens.
    pub fn from_cents(prompt: i64, completion: i64) -> Self {
        Self {
            prompt: Decimal::new(prompt, 2),
            completion: Decimal::new(completion, 2),
        }
    }

    /// Cost of `prompt_tokens` prompt tokens.
    pub fn prompt_cost(&self, prompt_tokens: u64) -> Decimal {
        per_million(self.prompt, prompt_tokens)
    }

    /// Cost of a finished call.
    pub fn cost(&self, usage: TokenUsage) -> Decimal {
        per_million(self.prompt, usage.prompt_tokens)
            + per_million(self.completion, usage.completion_tokens)
    }
}

fn per_million(price: Decimal, tokens: u64) -> Decimal {
    price * Decimal::from(tokens) / Decimal::from(1_000_000u64)
}

/// Model name → price.
///
/// Lookup tries the exact name first, then the longest registered prefix, so
/// dated snapshots such as `gpt-4o-2024-08-06` resolve to `gpt-4o`.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingTable {
    prices: HashMap<String, ModelPrice>,
}

impl PricingTable {
    /// Table with no entries; every model is free.
    pub fn empty() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    /// Add or replace an entry.
    pub fn with(mut self, model: impl Into<String>, price: ModelPrice) -> Self {
        self.prices.insert(model.into(), price);
        self
    }

    /// Price for `model`.
    pub fn get(&self, model: &str) -> Option<ModelPrice> {
        if let Some(price) = self.prices.get(model) {
            return Some(*price);
        }
        self.prices
            .iter()
            .filter(|(name, _)| model.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, price)| *price)
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::empty()
            .with("gpt-4o", ModelPrice::from_cents(250, 1000))
            .with("gpt-4o-mini", ModelPrice::from_cents(15, 60))
            .with("o1-mini", ModelPrice::from_cents(300, 1200))
            .with("o3-mini", ModelPrice::from_cents(110, 440))
    }
}
