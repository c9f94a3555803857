//! RAGex Infer — sentence-embedding backends and the query embedding cache.
//!
//! With the `onnx` feature enabled and model files on disk, `OnnxEmbedder`
//! provides all-MiniLM-L6-v2 embeddings. Otherwise `NoopEmbedder` reports
//! itself unavailable and callers surface the embedder error rather than
//! silently indexing nothing.

pub mod cache;
pub mod embedder;
pub mod onnx_embedder;

pub use cache::QueryCache;
pub use embedder::{EmbedderBackend, EmbeddingResult, NoopEmbedder};

#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;

use std::path::Path;
use std::sync::Arc;

/// Create the best embedder available for `model_dir`.
pub fn create_embedder(model_dir: &Path, dim: usize) -> Arc<dyn EmbedderBackend> {
    #[cfg(feature = "onnx")]
    {
        match OnnxEmbedder::load(model_dir) {
            Ok(embedder) => {
                tracing::info!("Using ONNX embedder (dim={})", embedder.dimension());
                return Arc::new(embedder);
            }
            Err(e) => {
                tracing::warn!("ONNX embedder unavailable: {}", e);
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_dir;
        tracing::info!("ONNX feature disabled; no embedding model loaded");
    }

    Arc::new(NoopEmbedder::new(dim))
}
