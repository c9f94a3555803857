//! RAGex Store — SQLite chunk store with int8 vector search.

pub mod embedding;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::ChunkStore;
pub use types::*;
