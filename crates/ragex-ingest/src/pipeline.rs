//! The canonical indexing pipeline.
//!
//! Every surface that mutates the chunk collection (CLI index/clean, HTTP
//! index and upload) funnels through `index_paths`. Nothing else writes to
//! the store, and clears happen here too rather than through a side door.

use std::path::PathBuf;

use ndarray::Array1;
use serde::Serialize;
use tracing::{info, warn};

use ragex_core::{messages, Error, Result};
use ragex_infer::EmbedderBackend;
use ragex_store::{ChunkStore, StoredChunk};

use crate::chunker::Chunker;
use crate::loader;

/// Immutable outcome of one indexing call, serialized verbatim to every
/// caller.
#[derive(Debug, Clone, Serialize)]
pub struct IndexingResult {
    pub documents_indexed: usize,
    pub chunks_created: usize,
    pub files_skipped: usize,
    pub cleared: bool,
    pub chunks_removed: i64,
    pub index_size_after: i64,
}

/// Validate, load, chunk, embed, and store documents end to end.
///
/// `clear_first` wipes the collection before anything else; an empty path
/// set with `clear_first` is a plain clear operation. A non-empty path set
/// from which zero files survive validation is an error, not an empty
/// success.
pub fn index_paths(
    store: &ChunkStore,
    embedder: &dyn EmbedderBackend,
    paths: &[PathBuf],
    clear_first: bool,
) -> Result<IndexingResult> {
    store.probe()?;

    let mut chunks_removed = 0i64;
    if clear_first {
        chunks_removed = store.clear()?;
    }

    let (valid_files, skipped) = loader::collect_inputs(paths);
    for skip in &skipped {
        warn!("Skipping {}: {}", skip.path.display(), skip.reason);
    }

    if valid_files.is_empty() {
        if clear_first && paths.is_empty() {
            let index_size_after = store.count_chunks()?;
            info!("Collection cleared, nothing to index");
            return Ok(IndexingResult {
                documents_indexed: 0,
                chunks_created: 0,
                files_skipped: 0,
                cleared: true,
                chunks_removed,
                index_size_after,
            });
        }
        return Err(Error::NoValidInputs(messages::NO_VALID_INPUTS.to_string()));
    }

    let chunker = Chunker::default();
    let mut documents_indexed = 0usize;
    let mut files_skipped = skipped.len();
    let mut all_chunks: Vec<StoredChunk> = Vec::new();

    for file in &valid_files {
        match loader::load_file(file) {
            Ok(segments) if !segments.is_empty() => {
                documents_indexed += 1;
                all_chunks.extend(chunker.chunk_segments(&segments));
            }
            Ok(_) => {
                warn!("No extractable text in {}", file.display());
                files_skipped += 1;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", file.display(), e);
                files_skipped += 1;
            }
        }
    }

    if documents_indexed == 0 {
        return Err(Error::NoValidInputs(messages::NO_VALID_INPUTS.to_string()));
    }

    let embedded = embed_chunks(embedder, all_chunks)?;
    let chunks_created = store.upsert_chunks(&embedded)?;
    let index_size_after = store.count_chunks()?;

    let result = IndexingResult {
        documents_indexed,
        chunks_created,
        files_skipped,
        cleared: clear_first,
        chunks_removed,
        index_size_after,
    };
    info!(
        "Indexed {} documents into {} chunks (skipped={}, cleared={}, size={})",
        result.documents_indexed,
        result.chunks_created,
        result.files_skipped,
        result.cleared,
        result.index_size_after
    );
    Ok(result)
}

/// Wipe the collection, returning the number of chunks removed.
pub fn clean_index(store: &ChunkStore) -> Result<i64> {
    store.probe()?;
    store.clear()
}

fn embed_chunks(
    embedder: &dyn EmbedderBackend,
    chunks: Vec<StoredChunk>,
) -> Result<Vec<(StoredChunk, Array1<f32>)>> {
    let mut embedded = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match embedder.embed(&chunk.text) {
            Some(result) => embedded.push((chunk, result.embedding)),
            None => {
                return Err(Error::Inference(messages::EMBEDDER_UNAVAILABLE.to_string()));
            }
        }
    }
    Ok(embedded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragex_infer::{EmbeddingResult, NoopEmbedder};
    use tempfile::TempDir;

    /// Deterministic embedder: hashes text into a fixed-dim vector.
    struct StubEmbedder {
        dim: usize,
    }

    impl EmbedderBackend for StubEmbedder {
        fn embed(&self, text: &str) -> Option<EmbeddingResult> {
            let mut v = Array1::zeros(self.dim);
            for (i, b) in text.bytes().enumerate() {
                v[i % self.dim] += b as f32 / 255.0;
            }
            Some(EmbeddingResult {
                embedding: v,
                cached: false,
            })
        }

        fn dimension(&self) -> usize {
            self.dim
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn setup() -> (ChunkStore, StubEmbedder, TempDir, TempDir) {
        let db_dir = TempDir::new().unwrap();
        let docs_dir = TempDir::new().unwrap();
        let store = ChunkStore::open(db_dir.path(), "ragex_chunks", 16).unwrap();
        (store, StubEmbedder { dim: 16 }, db_dir, docs_dir)
    }

    #[test]
    fn test_mixed_directory_counts_skips() {
        let (store, embedder, _db, docs) = setup();
        std::fs::write(docs.path().join("notes.txt"), "searchable content here").unwrap();
        std::fs::write(docs.path().join("tool.exe"), b"\x7fELF").unwrap();

        let result =
            index_paths(&store, &embedder, &[docs.path().to_path_buf()], false).unwrap();
        assert_eq!(result.documents_indexed, 1);
        assert_eq!(result.files_skipped, 1);
        assert_eq!(result.chunks_created, 1);
        assert!(!result.cleared);
        assert_eq!(result.index_size_after, 1);
    }

    #[test]
    fn test_reindexing_identical_content_is_stable() {
        let (store, embedder, _db, docs) = setup();
        std::fs::write(docs.path().join("a.txt"), "alpha beta gamma").unwrap();

        let first = index_paths(&store, &embedder, &[docs.path().to_path_buf()], false).unwrap();
        let second = index_paths(&store, &embedder, &[docs.path().to_path_buf()], false).unwrap();
        assert_eq!(first.index_size_after, second.index_size_after);
    }

    #[test]
    fn test_clear_first_reports_removed() {
        let (store, embedder, _db, docs) = setup();
        std::fs::write(docs.path().join("a.txt"), "first round of content").unwrap();
        index_paths(&store, &embedder, &[docs.path().to_path_buf()], false).unwrap();

        let result = index_paths(&store, &embedder, &[docs.path().to_path_buf()], true).unwrap();
        assert!(result.cleared);
        assert_eq!(result.chunks_removed, 1);
        assert_eq!(result.index_size_after, 1);
    }

    #[test]
    fn test_clear_only_invocation() {
        let (store, embedder, _db, docs) = setup();
        std::fs::write(docs.path().join("a.txt"), "content").unwrap();
        index_paths(&store, &embedder, &[docs.path().to_path_buf()], false).unwrap();

        let result = index_paths(&store, &embedder, &[], true).unwrap();
        assert!(result.cleared);
        assert_eq!(result.chunks_removed, 1);
        assert_eq!(result.documents_indexed, 0);
        assert_eq!(result.index_size_after, 0);
    }

    #[test]
    fn test_all_invalid_inputs_fail() {
        let (store, embedder, _db, docs) = setup();
        std::fs::write(docs.path().join("tool.exe"), b"\x7fELF").unwrap();

        let err = index_paths(&store, &embedder, &[docs.path().to_path_buf()], false).unwrap_err();
        assert!(matches!(err, Error::NoValidInputs(_)));
    }

    #[test]
    fn test_unavailable_embedder_is_fatal() {
        let (store, _embedder, _db, docs) = setup();
        std::fs::write(docs.path().join("a.txt"), "content").unwrap();
        let noop = NoopEmbedder::new(16);

        let err = index_paths(&store, &noop, &[docs.path().to_path_buf()], false).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_clean_index_returns_removed_count() {
        let (store, embedder, _db, docs) = setup();
        std::fs::write(docs.path().join("a.txt"), "content").unwrap();
        index_paths(&store, &embedder, &[docs.path().to_path_buf()], false).unwrap();

        assert_eq!(clean_index(&store).unwrap(), 1);
        assert_eq!(store.count_chunks().unwrap(), 0);
    }
}
