//! Pipeline configuration.

use std::path::PathBuf;
use std::str::FromStr;

use toolsmith_llm::{Decimal, Llm, Provider, ledger::DEFAULT_MAX_COST};

use crate::error::PipelineError;

/// Default repair-loop budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 30;

/// Default step budget for the install agent.
pub const DEFAULT_INSTALL_STEPS: usize = 20;

/// Models, budgets and paths for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Model for agent phases and short exchanges.
    pub model: String,
    /// Model for planning and the first implementation.
    pub reasoning_model: String,
    /// Spend ceiling in USD.
    pub max_cost: Decimal,
    /// Repair iterations before giving up.
    pub max_iterations: usize,
    /// Step budget for installation.
    pub install_max_steps: usize,
    /// Workspace root inside the sandbox.
    pub workspace_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            reasoning_model: "o1-mini".into(),
            max_cost: DEFAULT_MAX_COST,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            install_max_steps: DEFAULT_INSTALL_STEPS,
            workspace_dir: PathBuf::from("/workspace"),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `LLM_MODEL`, `LLM_MODEL_REASONING`,
    /// `TOOLSMITH_MAX_COST`, `TOOLSMITH_MAX_ITERATIONS` and
    /// `TOOLSMITH_WORKSPACE_DIR`.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`PipelineConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PipelineError> {
        let mut config = Self::default();
        if let Some(model) = lookup("LLM_MODEL") {
            config.model = model;
        }
        if let Some(model) = lookup("LLM_MODEL_REASONING") {
            config.reasoning_model = model;
        }
        if let Some(cost) = lookup("TOOLSMITH_MAX_COST") {
            config.max_cost = parse("TOOLSMITH_MAX_COST", &cost)?;
        }
        if let Some(iterations) = lookup("TOOLSMITH_MAX_ITERATIONS") {
            config.max_iterations = parse("TOOLSMITH_MAX_ITERATIONS", &iterations)?;
        }
        if let Some(dir) = lookup("TOOLSMITH_WORKSPACE_DIR") {
            config.workspace_dir = PathBuf::from(dir);
        }
        Ok(config)
    }
}

impl PipelineConfig {
    /// Wrap `provider` in a ledger with this config's spend ceiling.
    pub fn llm<P: Provider>(&self, provider: P) -> Llm<P> {
        Llm::new(provider).max_cost(self.max_cost)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, PipelineError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| PipelineError::Config(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.reasoning_model, "o1-mini");
        assert_eq!(config.max_cost, Decimal::new(5, 0));
        assert_eq!(config.max_iterations, 30);
    }

    #[test]
    fn overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("LLM_MODEL", "gpt-4o-mini"),
            ("TOOLSMITH_MAX_COST", "0.50"),
            ("TOOLSMITH_MAX_ITERATIONS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_cost, Decimal::new(50, 2));
        assert_eq!(config.max_iterations, 3);
    }

    #[test]
    fn bad_number_is_a_config_error() {
        let err = PipelineConfig::from_lookup(lookup(&[("TOOLSMITH_MAX_ITERATIONS", "many")]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(err.to_string().contains("TOOLSMITH_MAX_ITERATIONS"));
    }
}
