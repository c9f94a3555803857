//! Embedding backend trait.
//!
//! Everything that turns text into a dense vector implements
//! `EmbedderBackend`. Retrieval and indexing hold an `Arc<dyn
//! EmbedderBackend>` and never know which implementation is behind it.

use ndarray::Array1;

/// A single embedding, plus whether it was served from the query cache.
pub struct EmbeddingResult {
    pub embedding: Array1<f32>,
    pub cached: bool,
}

pub trait EmbedderBackend: Send + Sync {
    /// Embed one text. `None` means the backend cannot produce embeddings
    /// at all (model missing or feature disabled), not a per-text failure.
    fn embed(&self, text: &str) -> Option<EmbeddingResult>;

    /// Embed a batch of texts, in order.
    fn embed_batch(&self, texts: &[&str]) -> Vec<Option<EmbeddingResult>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize;

    /// Whether the backend has a usable model loaded.
    fn is_available(&self) -> bool;
}

/// Backend used when no embedding model can be loaded. Always unavailable;
/// callers surface the canonical embedder error instead of indexing nothing.
pub struct NoopEmbedder {
    dim: usize,
}

impl NoopEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl EmbedderBackend for NoopEmbedder {
    fn embed(&self, _text: &str) -> Option<EmbeddingResult> {
        None
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        false
    }
}
