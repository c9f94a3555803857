//! Data types for chunks and query results.

use serde::{Deserialize, Serialize};

/// Category of an indexed source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Text,
    Code,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Text => "text",
            FileKind::Code => "code",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pdf" => Some(FileKind::Pdf),
            "text" => Some(FileKind::Text),
            "code" => Some(FileKind::Code),
            _ => None,
        }
    }
}

/// Where a chunk came from within its source file.
///
/// Pages for paginated formats, line ranges otherwise; the two are mutually
/// exclusive by `FileKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    Page(u32),
    Lines { start: u32, end: u32 },
}

impl Provenance {
    /// Human-readable location label used in citations.
    pub fn label(&self) -> String {
        match self {
            Provenance::Page(n) => format!("page {}", n),
            Provenance::Lines { start, end } => format!("lines {}-{}", start, end),
        }
    }

    /// Stable identity component for chunk-id derivation.
    pub fn key(&self) -> String {
        match self {
            Provenance::Page(n) => format!("p{}", n),
            Provenance::Lines { start, end } => format!("l{}-{}", start, end),
        }
    }
}

/// A chunk row. Created only by the indexing pipeline, never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Content-derived hash, stable across re-indexing of identical content.
    pub chunk_id: String,
    pub text: String,
    /// Source file name as shown in citations.
    pub filename: String,
    pub file_type: FileKind,
    pub provenance: Provenance,
}

impl StoredChunk {
    /// Citation line for this chunk: `filename (page N)` or `filename (lines X-Y)`.
    pub fn citation(&self) -> String {
        format!("{} ({})", self.filename, self.provenance.label())
    }
}

/// A chunk with its similarity score for one query. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: StoredChunk,
    pub score: f64,
}

/// One source file as seen by the documents listing.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub file_type: FileKind,
    pub chunks: i64,
}

/// Store-level statistics for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_chunks: i64,
    pub distinct_documents: i64,
    pub embeddings_stored: i64,
    pub embedding_dimension: usize,
    pub db_path: String,
    pub db_size_mb: f64,
}
