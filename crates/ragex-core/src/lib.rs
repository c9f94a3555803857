//! RAGex Core — error taxonomy, canonical messages, configuration.

pub mod config;
pub mod error;

pub use config::{ConfigOverrides, DataPaths, Provider, RagexConfig};
pub use error::{messages, Error, Result};
