//! Database schema SQL for the chunk collection.

/// Chunk rows and their quantized embeddings. `chunk_id` is a content-derived
/// hash, so re-inserting identical content replaces rather than grows.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    chunk_id TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    filename TEXT NOT NULL,
    file_type TEXT NOT NULL,
    page INTEGER,
    line_start INTEGER,
    line_end INTEGER,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_filename ON chunks(filename);

CREATE TABLE IF NOT EXISTS chunk_embeddings (
    chunk_id TEXT PRIMARY KEY REFERENCES chunks(chunk_id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    scale REAL NOT NULL,
    offset_val REAL NOT NULL
);
"#;
