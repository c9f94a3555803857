//! SQLite-backed chunk store with int8 cosine-similarity search.
//!
//! The store is the only persistent mutable state in the system. It is written
//! exclusively by the indexing pipeline (`upsert_chunks` / `clear`) and read
//! by retrieval and listing. Embeddings are quantized to uint8 on disk and
//! held in a normalized float32 matrix in memory for search.

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tracing::{debug, error, info};

use crate::embedding::{dequantize_uint8, quantize_uint8};
use crate::schema::SCHEMA_SQL;
use crate::types::*;
use ragex_core::{messages, Error, Result};

/// SQLite chunk store. One file per collection: `<dir>/<collection>.db`.
pub struct ChunkStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    embedding_dim: usize,
    /// Pre-loaded normalized embedding matrix for vector search: (N, dim) float32.
    embedding_matrix: Mutex<EmbeddingMatrix>,
}

struct EmbeddingMatrix {
    /// Normalized embeddings, shape (N, dim).
    matrix: Array2<f32>,
    /// Chunk IDs corresponding to each row.
    chunk_ids: Vec<String>,
    /// Whether the matrix needs reloading.
    dirty: bool,
}

impl ChunkStore {
    /// Open or create the collection. Used by the indexing pipeline and the
    /// long-running server, which owns one handle for its lifetime.
    pub fn open(db_dir: impl AsRef<Path>, collection: &str, embedding_dim: usize) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| {
            error!("Cannot create store directory {}: {}", db_dir.display(), e);
            Error::IndexState(messages::VECTOR_STORE_UNAVAILABLE.to_string())
        })?;
        let db_path = db_dir.join(format!("{}.db", collection));

        let conn = Self::create_connection(&db_path)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            embedding_dim,
            embedding_matrix: Mutex::new(EmbeddingMatrix {
                matrix: Array2::zeros((0, embedding_dim)),
                chunk_ids: Vec::new(),
                dirty: true,
            }),
        };

        store.load_embedding_matrix()?;

        let count = store.count_chunks()?;
        info!(
            "ChunkStore ready: {} chunks, dim={}, path={}",
            count,
            embedding_dim,
            store.db_path.display()
        );
        Ok(store)
    }

    /// Open an existing collection for read paths. Fails with an index-state
    /// error if the collection has never been created; it is never created
    /// implicitly here.
    pub fn attach(db_dir: impl AsRef<Path>, collection: &str, embedding_dim: usize) -> Result<Self> {
        let db_path = db_dir.as_ref().join(format!("{}.db", collection));
        if !db_path.exists() {
            error!("Collection file missing: {}", db_path.display());
            return Err(Error::IndexState(messages::VECTOR_STORE_UNAVAILABLE.to_string()));
        }
        let store = Self::open(db_dir, collection, embedding_dim)?;
        store.probe()?;
        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| {
            error!("Cannot open {}: {}", db_path.display(), e);
            Error::IndexState(messages::VECTOR_STORE_UNAVAILABLE.to_string())
        })?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    /// Health probe, called before every index/query/list operation.
    ///
    /// Verifies both tables exist and are readable. Never repairs and never
    /// creates anything; failure carries the canonical recovery guidance.
    pub fn probe(&self) -> Result<()> {
        let conn = self.conn.lock();
        let check = || -> rusqlite::Result<()> {
            for table in ["chunks", "chunk_embeddings"] {
                let found: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    params![table],
                    |row| row.get(0),
                )?;
                if found == 0 {
                    return Err(rusqlite::Error::QueryReturnedNoRows);
                }
            }
            conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        };
        check().map_err(|e| {
            error!("Store probe failed at {}: {}", self.db_path.display(), e);
            Error::IndexState(messages::VECTOR_STORE_UNAVAILABLE.to_string())
        })
    }

    // ---------------------------------------------------------------
    // Writes (indexing pipeline only)
    // ---------------------------------------------------------------

    /// Insert chunks and their embeddings in one transaction.
    ///
    /// `INSERT OR REPLACE` keyed on the content-derived chunk id makes
    /// repeated indexing of identical inputs a no-op for the collection size.
    pub fn upsert_chunks(&self, chunks: &[(StoredChunk, Array1<f32>)]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let now = now_millis();
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;

        for (chunk, embedding) in chunks {
            let (page, line_start, line_end) = match chunk.provenance {
                Provenance::Page(p) => (Some(p as i64), None, None),
                Provenance::Lines { start, end } => (None, Some(start as i64), Some(end as i64)),
            };
            tx.execute(
                "INSERT OR REPLACE INTO chunks \
                 (chunk_id, text, filename, file_type, page, line_start, line_end, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    chunk.chunk_id,
                    chunk.text,
                    chunk.filename,
                    chunk.file_type.as_str(),
                    page,
                    line_start,
                    line_end,
                    now,
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;

            let (q_bytes, scale, offset) = quantize_uint8(embedding);
            tx.execute(
                "INSERT OR REPLACE INTO chunk_embeddings (chunk_id, embedding, scale, offset_val) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![chunk.chunk_id, q_bytes, scale, offset],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        }

        tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        self.embedding_matrix.lock().dirty = true;
        debug!("Upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    /// Wipe the entire collection. Returns the number of chunks removed.
    /// Per-chunk deletion is intentionally not supported.
    pub fn clear(&self) -> Result<i64> {
        let prior = self.count_chunks()?;
        let conn = self.conn.lock();
        conn.execute("DELETE FROM chunk_embeddings", [])
            .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute("DELETE FROM chunks", [])
            .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        self.embedding_matrix.lock().dirty = true;
        info!("Collection cleared ({} chunks removed)", prior);
        Ok(prior)
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Exact chunk count.
    pub fn count_chunks(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Get a chunk by ID.
    pub fn get_chunk(&self, chunk_id: &str) -> Result<Option<StoredChunk>> {
        use rusqlite::OptionalExtension;
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT chunk_id, text, filename, file_type, page, line_start, line_end \
                 FROM chunks WHERE chunk_id = ?1",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        stmt.query_row(params![chunk_id], Self::row_to_chunk)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Distinct source files with their chunk counts, ordered by filename.
    pub fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT filename, file_type, COUNT(*) AS chunks \
                 FROM chunks GROUP BY filename, file_type ORDER BY filename",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                let kind: String = row.get(1)?;
                Ok(DocumentSummary {
                    filename: row.get(0)?,
                    file_type: FileKind::from_str(&kind).unwrap_or(FileKind::Text),
                    chunks: row.get(2)?,
                })
            })
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Cosine similarity search using the pre-loaded normalized matrix.
    /// Returns up to `top_k` chunks, score-descending. Read-only.
    pub fn vector_search(&self, query_embedding: &Array1<f32>, top_k: usize) -> Result<Vec<ScoredChunk>> {
        self.ensure_matrix_loaded()?;

        let mat = self.embedding_matrix.lock();
        if mat.matrix.nrows() == 0 {
            return Ok(Vec::new());
        }

        let q_norm = query_embedding.dot(query_embedding).sqrt();
        if q_norm < 1e-9 {
            return Ok(Vec::new());
        }
        let q = query_embedding / q_norm;

        // Matrix multiply: (N, dim) @ (dim,) → (N,)
        let similarities = mat.matrix.dot(&q);

        let k = top_k.min(similarities.len());
        let mut indexed: Vec<(usize, f32)> = similarities
            .iter()
            .enumerate()
            .map(|(i, &s)| (i, s))
            .collect();
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        indexed.truncate(k);

        let top_chunk_ids: Vec<(String, f64)> = indexed
            .iter()
            .map(|&(i, s)| (mat.chunk_ids[i].clone(), s as f64))
            .collect();
        drop(mat);

        let mut results = Vec::with_capacity(k);
        for (cid, score) in top_chunk_ids {
            if let Some(chunk) = self.get_chunk(&cid)? {
                results.push(ScoredChunk { chunk, score });
            }
        }
        Ok(results)
    }

    /// Store statistics for diagnostics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let total = self.count_chunks()?;

        let conn = self.conn.lock();
        let docs: i64 = conn
            .query_row("SELECT COUNT(DISTINCT filename) FROM chunks", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        let embeddings: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunk_embeddings", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        let db_size = std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0);

        Ok(StoreStats {
            total_chunks: total,
            distinct_documents: docs,
            embeddings_stored: embeddings,
            embedding_dimension: self.embedding_dim,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: db_size as f64 / (1024.0 * 1024.0),
        })
    }

    // ---------------------------------------------------------------
    // Embedding matrix
    // ---------------------------------------------------------------

    fn load_embedding_matrix(&self) -> Result<()> {
        let mut chunk_ids = Vec::new();
        let mut embeddings: Vec<Array1<f32>> = Vec::new();

        {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare("SELECT chunk_id, embedding, scale, offset_val FROM chunk_embeddings")
                .map_err(|e| Error::Database(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    let chunk_id: String = row.get(0)?;
                    let blob: Vec<u8> = row.get(1)?;
                    let scale: f64 = row.get(2)?;
                    let offset: f64 = row.get(3)?;
                    Ok((chunk_id, blob, scale as f32, offset as f32))
                })
                .map_err(|e| Error::Database(e.to_string()))?;

            for row in rows {
                let (cid, blob, scale, offset) = row.map_err(|e| Error::Database(e.to_string()))?;
                chunk_ids.push(cid);
                embeddings.push(dequantize_uint8(&blob, scale, offset));
            }
        } // conn and stmt dropped here

        let mut mat = self.embedding_matrix.lock();
        if embeddings.is_empty() {
            mat.matrix = Array2::zeros((0, self.embedding_dim));
            mat.chunk_ids = Vec::new();
            mat.dirty = false;
            return Ok(());
        }

        let n = embeddings.len();
        let mut matrix = Array2::zeros((n, self.embedding_dim));
        for (i, emb) in embeddings.iter().enumerate() {
            matrix.row_mut(i).assign(emb);
        }

        // Normalize rows for cosine similarity via dot product
        for mut row in matrix.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 1e-9 {
                row /= norm;
            }
        }

        mat.matrix = matrix;
        mat.chunk_ids = chunk_ids;
        mat.dirty = false;
        debug!("Loaded {} embeddings into matrix", n);
        Ok(())
    }

    fn ensure_matrix_loaded(&self) -> Result<()> {
        if self.embedding_matrix.lock().dirty {
            self.load_embedding_matrix()?;
        }
        Ok(())
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredChunk> {
        let kind: String = row.get("file_type")?;
        let file_type = FileKind::from_str(&kind).unwrap_or(FileKind::Text);
        let page: Option<i64> = row.get("page")?;
        let line_start: Option<i64> = row.get("line_start")?;
        let line_end: Option<i64> = row.get("line_end")?;

        let provenance = match (page, line_start, line_end) {
            (Some(p), _, _) => Provenance::Page(p as u32),
            (None, Some(s), Some(e)) => Provenance::Lines {
                start: s as u32,
                end: e as u32,
            },
            _ => Provenance::Lines { start: 0, end: 0 },
        };

        Ok(StoredChunk {
            chunk_id: row.get("chunk_id")?,
            text: row.get("text")?,
            filename: row.get("filename")?,
            file_type,
            provenance,
        })
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
