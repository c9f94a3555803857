//! Concrete inference backends.
//!
//! `GroqBackend` speaks the OpenAI-compatible chat completions API;
//! `OllamaBackend` speaks the local Ollama chat API. Both classify every
//! failure into `AttemptError` and leave retrying to the orchestrator.

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::types::{AttemptError, InferenceBackend, LlmConfig};

const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Remote, OpenAI-compatible backend.
pub struct GroqBackend {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GroqBackend {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GROQ_API_BASE.to_string(),
        }
    }

    /// Endpoint override for tests.
    #[doc(hidden)]
    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }
}

impl InferenceBackend for GroqBackend {
    fn name(&self) -> &'static str {
        "groq"
    }

    fn is_local(&self) -> bool {
        false
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }

    fn check_requirements(&self) -> Result<(), AttemptError> {
        match &self.api_key {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(AttemptError::Unavailable("API key not configured".to_string())),
        }
    }

    fn complete<'a>(
        &'a self,
        system_prompt: &'a str,
        user_message: &'a str,
        config: &'a LlmConfig,
    ) -> BoxFuture<'a, Result<String, AttemptError>> {
        async move {
            let key = self.api_key.as_deref().unwrap_or_default();
            let body = json!({
                "model": config.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_message},
                ],
                "temperature": config.temperature,
                "max_tokens": config.max_tokens,
            });

            let url = format!("{}/chat/completions", self.base_url);
            debug!("POST {} model={}", url, config.model);

            let response = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", key))
                .timeout(config.timeout)
                .json(&body)
                .send()
                .await
                .map_err(classify_reqwest_error)?;

            if !response.status().is_success() {
                let status = response.status();
                let detail = response.text().await.unwrap_or_default();
                return Err(AttemptError::Unavailable(format!(
                    "API status {}: {}",
                    status, detail
                )));
            }

            let parsed: serde_json::Value = response
                .json()
                .await
                .map_err(|e| AttemptError::Unavailable(format!("bad response body: {}", e)))?;
            let content = parsed["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or_default();
            non_empty(content)
        }
        .boxed()
    }
}

/// Local Ollama backend.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
}

impl OllamaBackend {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Quick reachability ping, used only by the availability diagnostic.
    pub async fn ping(&self) -> Result<(), String> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("status {}", response.status()))
        }
    }
}

impl InferenceBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn is_local(&self) -> bool {
        true
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }

    fn check_requirements(&self) -> Result<(), AttemptError> {
        if self.base_url.trim().is_empty() {
            return Err(AttemptError::Unavailable("endpoint not configured".to_string()));
        }
        Ok(())
    }

    fn complete<'a>(
        &'a self,
        system_prompt: &'a str,
        user_message: &'a str,
        config: &'a LlmConfig,
    ) -> BoxFuture<'a, Result<String, AttemptError>> {
        async move {
            let body = json!({
                "model": config.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_message},
                ],
                "stream": false,
                "options": {
                    "temperature": config.temperature,
                    "num_predict": config.max_tokens,
                },
            });

            let url = format!("{}/api/chat", self.base_url);
            debug!("POST {} model={}", url, config.model);

            let response = self
                .client
                .post(&url)
                .timeout(config.timeout)
                .json(&body)
                .send()
                .await
                .map_err(classify_reqwest_error)?;

            if !response.status().is_success() {
                let status = response.status();
                let detail = response.text().await.unwrap_or_default();
                return Err(AttemptError::Unavailable(format!(
                    "API status {}: {}",
                    status, detail
                )));
            }

            let parsed: serde_json::Value = response
                .json()
                .await
                .map_err(|e| AttemptError::Unavailable(format!("bad response body: {}", e)))?;
            // Chat responses carry message.content; generate responses use
            // a top-level response field.
            let content = parsed["message"]["content"]
                .as_str()
                .or_else(|| parsed["response"].as_str())
                .unwrap_or_default();
            non_empty(content)
        }
        .boxed()
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> AttemptError {
    if e.is_timeout() {
        AttemptError::Timeout(e.to_string())
    } else {
        AttemptError::Unavailable(e.to_string())
    }
}

fn non_empty(content: &str) -> Result<String, AttemptError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Err(AttemptError::Unavailable("empty response".to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groq_requirements_need_key() {
        assert!(GroqBackend::new(None).check_requirements().is_err());
        assert!(GroqBackend::new(Some("   ".into())).check_requirements().is_err());
        assert!(GroqBackend::new(Some("gsk_test".into())).check_requirements().is_ok());
    }

    #[test]
    fn test_locality_flags() {
        let groq = GroqBackend::new(Some("k".into()));
        let ollama = OllamaBackend::new("http://localhost:11434".into());
        assert!(!groq.is_local());
        assert!(ollama.is_local());
    }

    #[test]
    fn test_non_empty_rejects_whitespace() {
        assert!(non_empty("").is_err());
        assert!(non_empty(" \n\t ").is_err());
        assert_eq!(non_empty("  answer  ").unwrap(), "answer");
    }
}
