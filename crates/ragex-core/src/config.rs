//! Configuration and data directory management.
//!
//! Load order is strict: hard-coded defaults, then `data/config.json`, then
//! environment variables, then explicit caller overrides — later sources win.
//! The loaded value is immutable; components receive it by reference and never
//! read process state themselves.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Inference backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Remote OpenAI-compatible API. Network-dependent.
    Groq,
    /// Local Ollama server. Offline-capable.
    Ollama,
}

impl Provider {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(Provider::Groq),
            "ollama" => Ok(Provider::Ollama),
            other => Err(Error::Config(format!(
                "Unknown provider '{}'. Expected 'groq' or 'ollama'.",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Groq => write!(f, "groq"),
            Provider::Ollama => write!(f, "ollama"),
        }
    }
}

/// Paths to all RAGex data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Vector database directory (`data/vectordb/`).
    pub vectordb: PathBuf,
    /// File uploads directory (`data/uploads/`).
    pub uploads: PathBuf,
    /// Persisted configuration (`data/config.json`).
    pub config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            vectordb: root.join("vectordb"),
            uploads: root.join("uploads"),
            config_file: root.join("config.json"),
            root,
        };
        std::fs::create_dir_all(&paths.vectordb)?;
        std::fs::create_dir_all(&paths.uploads)?;
        Ok(paths)
    }
}

/// Explicit caller overrides, the last (winning) configuration source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub offline_mode: Option<bool>,
}

/// Top-level RAGex configuration. Immutable after `load`.
#[derive(Debug, Clone, Serialize)]
pub struct RagexConfig {
    pub provider: Provider,
    pub model: String,
    #[serde(skip_serializing)]
    pub groq_api_key: Option<String>,
    pub ollama_base_url: String,
    pub offline_mode: bool,
    /// LLM request timeout in seconds, clamped to 1..=300.
    pub llm_timeout_secs: u64,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub collection_name: String,
    pub candidate_k: usize,
    pub min_score_threshold: f64,
    pub drop_off_threshold: f64,
    pub refusal_response: String,
    pub generation_temperature: f64,
    pub generation_max_tokens: usize,
    pub port: u16,
    pub data_paths: DataPaths,
}

/// Optional-field mirror of `RagexConfig` for the persisted config file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    provider: Option<String>,
    model: Option<String>,
    groq_api_key: Option<String>,
    ollama_base_url: Option<String>,
    offline_mode: Option<bool>,
    llm_timeout_secs: Option<u64>,
    embedding_model: Option<String>,
    collection_name: Option<String>,
    candidate_k: Option<usize>,
    min_score_threshold: Option<f64>,
    drop_off_threshold: Option<f64>,
    refusal_response: Option<String>,
    generation_temperature: Option<f64>,
    generation_max_tokens: Option<usize>,
    port: Option<u16>,
}

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_REFUSAL_RESPONSE: &str = "Answer: Not found in indexed documents.";

impl RagexConfig {
    /// Load configuration rooted at `data_dir`, applying all sources in order.
    pub fn load(data_dir: impl AsRef<Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let data_paths = DataPaths::new(data_dir)?;

        // 1. Defaults
        let mut config = Self::defaults(data_paths);

        // 2. Persisted config file
        config.apply_file(&Self::read_file_config(&config.data_paths.config_file));

        // 3. Environment variables
        config.apply_env();

        // 4. Explicit caller overrides
        if let Some(p) = overrides.provider {
            config.provider = p;
        }
        if let Some(m) = &overrides.model {
            config.model = m.clone();
        }
        if let Some(o) = overrides.offline_mode {
            config.offline_mode = o;
        }

        config.normalize();
        Ok(config)
    }

    fn defaults(data_paths: DataPaths) -> Self {
        Self {
            provider: Provider::Groq,
            model: DEFAULT_MODEL.into(),
            groq_api_key: None,
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.into(),
            offline_mode: false,
            llm_timeout_secs: 45,
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            embedding_dim: 384,
            collection_name: "ragex_chunks".into(),
            candidate_k: 20,
            min_score_threshold: 0.40,
            drop_off_threshold: 0.10,
            refusal_response: DEFAULT_REFUSAL_RESPONSE.into(),
            generation_temperature: 0.1,
            generation_max_tokens: 500,
            port: 8000,
            data_paths,
        }
    }

    fn read_file_config(path: &Path) -> FileConfig {
        match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!("Ignoring malformed config file {}: {}", path.display(), e);
                FileConfig::default()
            }),
            Err(_) => FileConfig::default(),
        }
    }

    fn apply_file(&mut self, file: &FileConfig) {
        if let Some(p) = &file.provider {
            if let Ok(p) = Provider::parse(p) {
                self.provider = p;
            }
        }
        if let Some(v) = &file.model {
            self.model = v.clone();
        }
        if let Some(v) = &file.groq_api_key {
            self.groq_api_key = Some(v.clone());
        }
        if let Some(v) = &file.ollama_base_url {
            self.ollama_base_url = v.clone();
        }
        if let Some(v) = file.offline_mode {
            self.offline_mode = v;
        }
        if let Some(v) = file.llm_timeout_secs {
            self.llm_timeout_secs = v;
        }
        if let Some(v) = &file.embedding_model {
            self.embedding_model = v.clone();
        }
        if let Some(v) = &file.collection_name {
            self.collection_name = v.clone();
        }
        if let Some(v) = file.candidate_k {
            self.candidate_k = v;
        }
        if let Some(v) = file.min_score_threshold {
            self.min_score_threshold = v;
        }
        if let Some(v) = file.drop_off_threshold {
            self.drop_off_threshold = v;
        }
        if let Some(v) = &file.refusal_response {
            self.refusal_response = v.clone();
        }
        if let Some(v) = file.generation_temperature {
            self.generation_temperature = v;
        }
        if let Some(v) = file.generation_max_tokens {
            self.generation_max_tokens = v;
        }
        if let Some(v) = file.port {
            self.port = v;
        }
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_str(&["RAG_PROVIDER", "RAG_MODEL_PROVIDER"]) {
            if let Ok(p) = Provider::parse(&v) {
                self.provider = p;
            }
        }
        if let Some(v) = env_str(&["RAG_MODEL_NAME", "GROQ_MODEL"]) {
            self.model = v;
        }
        if let Some(v) = env_str(&["GROQ_API_KEY"]) {
            self.groq_api_key = Some(v);
        }
        if let Some(v) = env_str(&["OLLAMA_BASE_URL"]) {
            self.ollama_base_url = v;
        }
        if let Some(v) = env_str(&["OFFLINE_MODE", "RAG_OFFLINE"]) {
            self.offline_mode = parse_bool(&v);
        }
        if let Some(v) = env_str(&["LLM_TIMEOUT"]) {
            if let Ok(t) = v.parse() {
                self.llm_timeout_secs = t;
            }
        }
        if let Some(v) = env_str(&["EMBEDDING_MODEL_NAME", "EMBEDDING_MODEL"]) {
            self.embedding_model = v;
        }
        if let Some(v) = env_str(&["COLLECTION_NAME"]) {
            self.collection_name = v;
        }
        if let Some(v) = env_str(&["REFUSAL_RESPONSE"]) {
            self.refusal_response = v;
        }
        if let Some(v) = env_str(&["PORT"]) {
            if let Ok(p) = v.parse() {
                self.port = p;
            }
        }
    }

    fn normalize(&mut self) {
        self.llm_timeout_secs = self.llm_timeout_secs.clamp(1, 300);
        while self.ollama_base_url.ends_with('/') {
            self.ollama_base_url.pop();
        }
    }

    /// Effective configuration for display, with the API key masked.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": self.provider.to_string(),
            "model": self.model,
            "groq_api_key": self.groq_api_key.as_deref().map(mask_secret),
            "ollama_base_url": self.ollama_base_url,
            "offline_mode": self.offline_mode,
            "llm_timeout_secs": self.llm_timeout_secs,
            "embedding_model": self.embedding_model,
            "embedding_dim": self.embedding_dim,
            "collection_name": self.collection_name,
            "candidate_k": self.candidate_k,
            "min_score_threshold": self.min_score_threshold,
            "drop_off_threshold": self.drop_off_threshold,
            "refusal_response": self.refusal_response,
            "generation_temperature": self.generation_temperature,
            "generation_max_tokens": self.generation_max_tokens,
            "port": self.port,
            "vectordb_path": self.data_paths.vectordb.display().to_string(),
        })
    }
}

fn env_str(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| std::env::var(n).ok())
        .filter(|v| !v.trim().is_empty())
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn mask_secret(key: &str) -> String {
    if key.len() > 8 {
        format!("{}...{}", &key[..4], &key[key.len() - 4..])
    } else {
        "***".into()
    }
}
