//! Shared application state.

use std::sync::Arc;

use ragex_core::RagexConfig;
use ragex_infer::EmbedderBackend;
use ragex_llm::Orchestrator;
use ragex_store::ChunkStore;

/// State shared by every route handler.
pub struct AppState {
    pub config: RagexConfig,
    pub store: ChunkStore,
    pub embedder: Arc<dyn EmbedderBackend>,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(config: RagexConfig, store: ChunkStore, embedder: Arc<dyn EmbedderBackend>) -> Self {
        let orchestrator = Orchestrator::from_config(&config);
        Self {
            config,
            store,
            embedder,
            orchestrator,
        }
    }
}
