//! Overlapping text chunking over loaded segments.
//!
//! Splits on the coarsest separator present ("\n\n", "\n", " ", then raw
//! characters) and packs splits into chunks of at most `chunk_size`
//! characters, carrying `chunk_overlap` characters of trailing context into
//! the next chunk. Each chunk keeps its segment's provenance, so a 2000-char
//! chunk never cites wider than its source page or line window.

use sha2::{Digest, Sha256};

use ragex_store::StoredChunk;

use crate::loader::DocumentSegment;

pub const DEFAULT_CHUNK_SIZE: usize = 2000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<&'static str>,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: vec!["\n\n", "\n", " ", ""],
        }
    }

    /// Chunk every segment, preserving its metadata. Blank chunks are
    /// dropped. Chunk ids are derived from content so re-indexing identical
    /// input yields identical ids.
    pub fn chunk_segments(&self, segments: &[DocumentSegment]) -> Vec<StoredChunk> {
        let mut chunks = Vec::new();
        for segment in segments {
            if segment.text.trim().is_empty() {
                continue;
            }
            for (i, text) in self.split_text(&segment.text).into_iter().enumerate() {
                if text.trim().is_empty() {
                    continue;
                }
                let chunk_id = derive_chunk_id(segment, i, &text);
                chunks.push(StoredChunk {
                    chunk_id,
                    text,
                    filename: segment.filename.clone(),
                    file_type: segment.file_type,
                    provenance: segment.provenance.clone(),
                });
            }
        }
        chunks
    }

    /// Split text into overlapping pieces of at most `chunk_size` chars.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.chars().count() <= self.chunk_size {
            return vec![text.to_string()];
        }

        // Coarsest separator actually present wins.
        let separator = self
            .separators
            .iter()
            .find(|s| !s.is_empty() && text.contains(**s))
            .copied()
            .unwrap_or("");

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator).map(String::from).collect()
        };
        let sep_len = separator.chars().count();

        let mut final_chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_len = 0usize;

        for split in splits {
            let split_len = split.chars().count();

            if current_len + split_len + sep_len > self.chunk_size && !current.is_empty() {
                final_chunks.push(current.join(separator));

                // Carry trailing splits forward as overlap.
                let mut overlap: Vec<String> = Vec::new();
                let mut overlap_len = 0usize;
                for item in current.iter().rev() {
                    let item_len = item.chars().count();
                    if overlap_len + item_len + sep_len <= self.chunk_overlap {
                        overlap.insert(0, item.clone());
                        overlap_len += item_len + sep_len;
                    } else {
                        break;
                    }
                }
                current = overlap;
                current_len = overlap_len;
            }

            current_len += split_len + sep_len;
            current.push(split);
        }

        if !current.is_empty() {
            let tail = current.join(separator);
            if !tail.is_empty() {
                final_chunks.push(tail);
            }
        }

        final_chunks
    }
}

fn derive_chunk_id(segment: &DocumentSegment, index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(segment.filename.as_bytes());
    hasher.update(b"|");
    hasher.update(segment.provenance.key().as_bytes());
    hasher.update(b"|");
    hasher.update(index.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
