//! Generation orchestration: one retry/backoff/offline contract over every
//! backend.
//!
//! Callers cannot tell which backend is active from timing, retry count, or
//! error text. Generation-path log lines say only "inference request"; the
//! availability diagnostic is the one place a backend name appears.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use ragex_core::{messages, Error, Provider, RagexConfig, Result};

use crate::providers::{GroqBackend, OllamaBackend};
use crate::types::{AttemptError, InferenceBackend, LlmConfig};

/// Availability diagnostic payload. This check may name the backend; the
/// generation path never does.
#[derive(Debug, Serialize)]
pub struct Availability {
    pub available: bool,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub struct Orchestrator {
    backend: Arc<dyn InferenceBackend>,
    offline_mode: bool,
}

impl Orchestrator {
    /// Select the backend from configuration. No requirement validation
    /// happens here, so configuration can be inspected without tripping it.
    pub fn from_config(config: &RagexConfig) -> Self {
        let backend: Arc<dyn InferenceBackend> = match config.provider {
            Provider::Groq => Arc::new(GroqBackend::new(config.groq_api_key.clone())),
            Provider::Ollama => Arc::new(OllamaBackend::new(config.ollama_base_url.clone())),
        };
        Self {
            backend,
            offline_mode: config.offline_mode,
        }
    }

    /// Inject a backend directly (tests, embedding in other runtimes).
    pub fn with_backend(backend: Arc<dyn InferenceBackend>, offline_mode: bool) -> Self {
        Self {
            backend,
            offline_mode,
        }
    }

    /// Generate a completion with the shared retry contract: offline policy
    /// first, requirement check once, then up to `total_attempts` tries with
    /// exponential backoff (1s, 2s) between them.
    pub async fn generate(
        &self,
        system_prompt: &str,
        user_message: &str,
        config: &LlmConfig,
    ) -> Result<String> {
        self.enforce_offline_policy()?;

        if let Err(e) = self.backend.check_requirements() {
            warn!("Inference requirements unmet: {}", e.detail());
            return Err(Error::ProviderUnavailable(
                messages::PROVIDER_NOT_CONFIGURED.to_string(),
            ));
        }

        let total = config.total_attempts();
        let mut last_error: Option<AttemptError> = None;

        for attempt in 0..total {
            info!("inference request (attempt {}/{})", attempt + 1, total);

            match self
                .backend
                .complete(system_prompt, user_message, config)
                .await
            {
                Ok(text) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        return Ok(trimmed.to_string());
                    }
                    // Whitespace-only output is a failed attempt like any
                    // other, regardless of what the backend accepted.
                    warn!(
                        "inference request returned blank output (attempt {}/{})",
                        attempt + 1,
                        total
                    );
                    last_error = Some(AttemptError::Unavailable("blank output".to_string()));
                    if attempt + 1 < total {
                        let delay = Duration::from_secs(1u64 << attempt);
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    warn!(
                        "inference request failed (attempt {}/{}): {}",
                        attempt + 1,
                        total,
                        e.detail()
                    );
                    last_error = Some(e);
                    if attempt + 1 < total {
                        let delay = Duration::from_secs(1u64 << attempt);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(classify(last_error.unwrap_or_else(|| {
            AttemptError::Unavailable("no attempt recorded".to_string())
        })))
    }

    /// Offline mode permits only the local backend, and only when its
    /// endpoint resolves to loopback. Enforced before any network attempt.
    fn enforce_offline_policy(&self) -> Result<()> {
        if !self.offline_mode {
            return Ok(());
        }
        if !self.backend.is_local() {
            return Err(Error::ProviderUnavailable(messages::OFFLINE_MODE.to_string()));
        }
        if !endpoint_is_loopback(self.backend.endpoint()) {
            return Err(Error::ProviderUnavailable(
                messages::OFFLINE_LOCAL_ENDPOINT.to_string(),
            ));
        }
        Ok(())
    }

    /// Non-generation diagnostic: is the configured backend usable right
    /// now. May name the backend.
    pub async fn check_availability(&self) -> Availability {
        let provider = self.backend.name().to_string();

        if let Err(e) = self.enforce_offline_policy() {
            return Availability {
                available: false,
                provider,
                reason: Some(e.canonical_message().to_string()),
            };
        }
        if let Err(e) = self.backend.check_requirements() {
            return Availability {
                available: false,
                provider,
                reason: Some(e.detail().to_string()),
            };
        }

        Availability {
            available: true,
            provider,
            reason: None,
        }
    }
}

fn classify(e: AttemptError) -> Error {
    match e {
        AttemptError::Timeout(_) => Error::ProviderTimeout(messages::PROVIDER_TIMEOUT.to_string()),
        AttemptError::Unavailable(_) => {
            Error::ProviderUnavailable(messages::PROVIDER_UNAVAILABLE.to_string())
        }
    }
}

/// Whether a URL's host is 127.0.0.1, ::1, or the literal `localhost`.
pub fn endpoint_is_loopback(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url);
    let authority = rest.split(['/', '?']).next().unwrap_or(rest);

    // Bracketed IPv6 host, e.g. [::1]:11434
    let host = if let Some(stripped) = authority.strip_prefix('[') {
        match stripped.split(']').next() {
            Some(h) => h,
            None => return false,
        }
    } else {
        authority.rsplit_once(':').map(|(h, _)| h).unwrap_or(authority)
    };

    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<std::net::IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}
