//! RAGex Retrieve — query intent classification and dynamic-K evidence
//! retrieval over the chunk store.

pub mod intent;
pub mod retriever;

pub use intent::{detect_intent, QueryIntent};
pub use retriever::{apply_threshold, drop_off_truncate, retrieve};

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use ragex_core::{ConfigOverrides, RagexConfig};
    use ragex_infer::{EmbedderBackend, EmbeddingResult};
    use ragex_store::{ChunkStore, FileKind, Provenance, StoredChunk};
    use tempfile::TempDir;

    struct StubEmbedder;

    impl EmbedderBackend for StubEmbedder {
        fn embed(&self, text: &str) -> Option<EmbeddingResult> {
            let mut v = Array1::zeros(8);
            for (i, b) in text.bytes().enumerate() {
                v[i % 8] += b as f32 / 255.0;
            }
            Some(EmbeddingResult {
                embedding: v,
                cached: false,
            })
        }

        fn dimension(&self) -> usize {
            8
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn test_config(data_dir: &std::path::Path) -> RagexConfig {
        RagexConfig::load(data_dir, &ConfigOverrides::default()).unwrap()
    }

    fn chunk(id: &str, text: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            text: text.to_string(),
            filename: "doc.txt".to_string(),
            file_type: FileKind::Text,
            provenance: Provenance::Lines { start: 1, end: 50 },
        }
    }

    #[test]
    fn test_blank_query_returns_empty() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::open(dir.path().join("db"), "ragex_chunks", 8).unwrap();
        let config = test_config(dir.path());

        let evidence = retrieve(&store, &StubEmbedder, &config, "   ").unwrap();
        assert!(evidence.is_empty());
    }

    #[test]
    fn test_identical_text_scores_high() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::open(dir.path().join("db"), "ragex_chunks", 8).unwrap();
        let config = test_config(dir.path());

        let text = "a microprocessor is a cpu on a chip";
        let emb = StubEmbedder.embed(text).unwrap().embedding;
        store.upsert_chunks(&[(chunk("a", text), emb)]).unwrap();

        let evidence = retrieve(&store, &StubEmbedder, &config, text).unwrap();
        assert_eq!(evidence.len(), 1);
        assert!(evidence[0].score > 0.99);
    }

    #[test]
    fn test_empty_store_returns_empty() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::open(dir.path().join("db"), "ragex_chunks", 8).unwrap();
        let config = test_config(dir.path());

        let evidence = retrieve(&store, &StubEmbedder, &config, "anything at all").unwrap();
        assert!(evidence.is_empty());
    }
}
