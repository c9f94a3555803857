//! RAGex LLM — inference backends and the orchestration layer that gives
//! them one retry, backoff, and offline-policy contract.

pub mod orchestrator;
pub mod providers;
pub mod types;

pub use orchestrator::{endpoint_is_loopback, Availability, Orchestrator};
pub use providers::{GroqBackend, OllamaBackend};
pub use types::{AttemptError, InferenceBackend, LlmConfig};
