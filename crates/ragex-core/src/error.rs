//! Error types for RAGex.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Zero files survived validation for an indexing call.
    #[error("{0}")]
    NoValidInputs(String),

    /// Index store is missing, unreadable, or corrupted. Carries recovery guidance.
    #[error("{0}")]
    IndexState(String),

    /// Generation request timed out after all retries.
    #[error("{0}")]
    ProviderTimeout(String),

    /// Generation backend is unreachable, misconfigured, or disabled by policy.
    #[error("{0}")]
    ProviderUnavailable(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The canonical, user-facing message for this error.
    ///
    /// Every surface (CLI, HTTP) renders this exact text for the same
    /// condition; diagnostic detail goes to the log only.
    pub fn canonical_message(&self) -> &str {
        match self {
            Error::NoValidInputs(m)
            | Error::IndexState(m)
            | Error::ProviderTimeout(m)
            | Error::ProviderUnavailable(m) => m,
            Error::Inference(_) => messages::EMBEDDER_UNAVAILABLE,
            Error::Database(_) => messages::VECTOR_STORE_UNAVAILABLE,
            Error::Config(m) => m,
            Error::Io(_) | Error::Json(_) | Error::Internal(_) => messages::GENERIC,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Canonical user-facing messages, one per error condition.
///
/// Provider-path messages never name the active backend.
pub mod messages {
    pub const OFFLINE_MODE: &str =
        "Offline mode is enabled. Remote providers are disabled. Use the local provider or disable offline mode.";
    pub const OFFLINE_LOCAL_ENDPOINT: &str =
        "Offline mode requires the local provider endpoint to resolve to localhost. Update the endpoint or disable offline mode.";
    pub const PROVIDER_NOT_CONFIGURED: &str =
        "Inference provider is not configured. Set the required credentials or switch providers.";
    pub const PROVIDER_UNAVAILABLE: &str =
        "LLM provider unavailable. Please try again later or switch providers.";
    pub const PROVIDER_TIMEOUT: &str =
        "LLM provider timed out. Please try again in a moment.";
    pub const NO_VALID_INPUTS: &str =
        "No valid documents were found. Provide supported files and try again.";
    pub const VECTOR_STORE_UNAVAILABLE: &str =
        "Vector store is unavailable or unreadable. Run 'ragex clean' to rebuild the index.";
    pub const EMBEDDER_UNAVAILABLE: &str =
        "Embedding model is unavailable. Install the model files and try again.";
    pub const DOCUMENTS_LIST_FAILED: &str =
        "Unable to retrieve document metadata at this time.";
    pub const GENERIC: &str =
        "Something went wrong. Please try again or run with --verbose for details.";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_message_passthrough() {
        let err = Error::IndexState(messages::VECTOR_STORE_UNAVAILABLE.to_string());
        assert_eq!(err.canonical_message(), messages::VECTOR_STORE_UNAVAILABLE);
    }

    #[test]
    fn test_internal_errors_render_generic() {
        let err = Error::Internal("stack detail the user must not see".into());
        assert_eq!(err.canonical_message(), messages::GENERIC);
    }
}
