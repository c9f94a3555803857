//! Shared types for the inference layer.

use std::time::Duration;

use futures::future::BoxFuture;

use ragex_core::RagexConfig;

/// Configuration for one generation call. Identical shape for every
/// backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: usize,
    pub timeout: Duration,
    /// Retries after the first attempt; total attempts = max_retries + 1.
    pub max_retries: u32,
}

impl LlmConfig {
    pub fn from_config(config: &RagexConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.generation_temperature,
            max_tokens: config.generation_max_tokens,
            timeout: Duration::from_secs(config.llm_timeout_secs),
            max_retries: 2,
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Classified outcome of a single failed attempt. The carried string is
/// diagnostic detail for the log; callers map the variant to the canonical
/// backend-agnostic error.
#[derive(Debug, Clone)]
pub enum AttemptError {
    /// The request exceeded its deadline.
    Timeout(String),
    /// Connection failure, empty response, bad status, or missing
    /// configuration.
    Unavailable(String),
}

impl AttemptError {
    pub fn detail(&self) -> &str {
        match self {
            AttemptError::Timeout(d) | AttemptError::Unavailable(d) => d,
        }
    }
}

/// One inference backend behind the orchestrator.
///
/// Implementations never retry and never sleep; the orchestrator owns the
/// retry loop so both backends share one failure contract.
pub trait InferenceBackend: Send + Sync {
    /// Backend name, used only by the availability diagnostic. Generation
    /// logs never include it.
    fn name(&self) -> &'static str;

    /// Whether this backend runs against a local endpoint and is therefore
    /// a candidate under offline mode.
    fn is_local(&self) -> bool;

    /// The configured endpoint, for the offline loopback check.
    fn endpoint(&self) -> &str;

    /// Validate required configuration. Runs once, immediately before the
    /// first attempt of a generation call, never at construction.
    fn check_requirements(&self) -> Result<(), AttemptError>;

    /// One completion attempt. Must resolve within `config.timeout`.
    fn complete<'a>(
        &'a self,
        system_prompt: &'a str,
        user_message: &'a str,
        config: &'a LlmConfig,
    ) -> BoxFuture<'a, Result<String, AttemptError>>;
}
