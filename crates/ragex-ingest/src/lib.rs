//! RAGex Ingest — input validation, text extraction, chunking, and the one
//! indexing pipeline all write paths share.

pub mod chunker;
pub mod loader;
pub mod pipeline;

pub use chunker::{Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use loader::{DocumentSegment, SkippedInput, LINES_PER_SEGMENT, MAX_FILE_SIZE_BYTES};
pub use pipeline::{clean_index, index_paths, IndexingResult};
