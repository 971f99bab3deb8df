//! Knowledge store persistence.
//!
//! Chunks live in SQLite with an FTS5 index; the `sources` table is the
//! ingestion manifest that lets re-ingestion skip files already stored.

pub mod sqlite;

pub use sqlite::{KnowledgeStats, SourceRecord, SqliteKnowledgeStore};

/// Default knowledge store path, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".rag/knowledge.db";
