//! SQLite knowledge store with FTS5 full-text search.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::agent::retriever::KnowledgeRetriever;
use crate::agent::state::EvidenceChunk;
use crate::error::{AgentError, StorageError};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS sources (
        path TEXT PRIMARY KEY,
        chunk_count INTEGER NOT NULL,
        ingested_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
    );

    CREATE TABLE IF NOT EXISTS chunks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source TEXT NOT NULL REFERENCES sources(path),
        position INTEGER NOT NULL,
        content TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source, position);

    CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
        content,
        source UNINDEXED,
        position UNINDEXED,
        content_rowid=id,
        tokenize='porter unicode61'
    );

    CREATE TRIGGER IF NOT EXISTS chunks_ai AFTER INSERT ON chunks BEGIN
        INSERT INTO chunks_fts(rowid, content, source, position)
        VALUES (new.id, new.content, new.source, new.position);
    END;
";

/// Chunk and source counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeStats {
    /// Ingested source files.
    pub sources: usize,
    /// Stored chunks.
    pub chunks: usize,
}

/// One row of the ingestion manifest.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRecord {
    /// Source path as ingested.
    pub path: String,
    /// Chunks stored for it.
    pub chunk_count: usize,
    /// UTC ingestion time, RFC 3339.
    pub ingested_at: String,
}

/// SQLite-backed knowledge store.
///
/// Ranking is delegated to FTS5's built-in `bm25` rank. The connection is
/// shared so async retrieval can search on tokio's blocking pool.
pub struct SqliteKnowledgeStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteKnowledgeStore {
    /// Opens or creates a store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the parent directory cannot be created
    /// or the schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(SCHEMA)?;

        debug!(path = %path.display(), "knowledge store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens an existing store without creating it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when no file exists at `path`.
    pub fn open_existing(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            return Err(StorageError::NotFound(path.to_path_buf()));
        }
        Self::open(path)
    }

    /// Opens an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the schema cannot be applied.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file path, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        lock_conn(&self.conn)
    }

    /// Whether `source` is already in the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database failure.
    pub fn has_source(&self, source: &str) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM sources WHERE path = ?1",
                params![source],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Stores the chunks of `source` and records it in the manifest.
    ///
    /// Runs in a single transaction. Returns the number of chunks stored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database failure, including when the
    /// source is already recorded.
    pub fn add_source(&self, source: &str, chunks: &[String]) -> Result<usize, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO sources (path, chunk_count) VALUES (?1, ?2)",
            params![source, to_sql_int(chunks.len())],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (source, position, content) VALUES (?1, ?2, ?3)",
            )?;
            for (position, content) in chunks.iter().enumerate() {
                stmt.execute(params![source, to_sql_int(position), content])?;
            }
        }
        tx.commit()?;

        debug!(source, chunks = chunks.len(), "source stored");
        Ok(chunks.len())
    }

    /// Full-text search over stored chunks, best matches first.
    ///
    /// Each word of `text` is matched as a quoted term and terms are
    /// OR-joined. Text without words matches nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database failure.
    pub fn search(&self, text: &str, top_k: usize) -> Result<Vec<EvidenceChunk>, StorageError> {
        search_conn(&self.conn, text, top_k)
    }

    /// Source and chunk counts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database failure.
    pub fn stats(&self) -> Result<KnowledgeStats, StorageError> {
        let conn = self.lock()?;
        let sources: i64 = conn.query_row("SELECT COUNT(*) FROM sources", [], |r| r.get(0))?;
        let chunks: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
        Ok(KnowledgeStats {
            sources: usize::try_from(sources).unwrap_or_default(),
            chunks: usize::try_from(chunks).unwrap_or_default(),
        })
    }

    /// Whether the store holds at least one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database failure.
    pub fn is_populated(&self) -> Result<bool, StorageError> {
        Ok(self.stats()?.chunks > 0)
    }

    /// Lists the ingestion manifest, ordered by path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database failure.
    pub fn list_sources(&self) -> Result<Vec<SourceRecord>, StorageError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT path, chunk_count, ingested_at FROM sources ORDER BY path")?;
        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok(SourceRecord {
                path: row.get(0)?,
                chunk_count: usize::try_from(count).unwrap_or_default(),
                ingested_at: row.get(2)?,
            })
        })?;

        let mut sources = Vec::new();
        for row in rows {
            sources.push(row?);
        }
        Ok(sources)
    }
}

#[async_trait]
impl KnowledgeRetriever for SqliteKnowledgeStore {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<EvidenceChunk>, AgentError> {
        let conn = Arc::clone(&self.conn);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || search_conn(&conn, &text, top_k))
            .await
            .map_err(|e| AgentError::Retrieval {
                message: format!("search task failed: {e}"),
            })?
            .map_err(|e| AgentError::Retrieval {
                message: e.to_string(),
            })
    }
}

fn lock_conn(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StorageError> {
    conn.lock().map_err(|_| StorageError::LockPoisoned)
}

fn search_conn(
    conn: &Mutex<Connection>,
    text: &str,
    top_k: usize,
) -> Result<Vec<EvidenceChunk>, StorageError> {
    let Some(expr) = match_expression(text) else {
        return Ok(Vec::new());
    };
    if top_k == 0 {
        return Ok(Vec::new());
    }

    let conn = lock_conn(conn)?;
    let mut stmt = conn.prepare(
        "SELECT content, source, position, rank
         FROM chunks_fts
         WHERE chunks_fts MATCH ?1
         ORDER BY rank
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![expr, to_sql_int(top_k)], |row| {
        let position: i64 = row.get(2)?;
        Ok(EvidenceChunk {
            content: row.get(0)?,
            source: row.get(1)?,
            position: usize::try_from(position).unwrap_or_default(),
            score: row.get(3)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}


/// Builds an FTS5 MATCH expression from free text.
fn match_expression(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .unicode_words()
        .map(|w| format!("\"{}\"", w.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

fn to_sql_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(sources: &[(&str, &[&str])]) -> SqliteKnowledgeStore {
        let store = SqliteKnowledgeStore::in_memory().unwrap_or_else(|_| unreachable!());
        for (path, chunks) in sources {
            let chunks: Vec<String> = chunks.iter().map(ToString::to_string).collect();
            store
                .add_source(path, &chunks)
                .unwrap_or_else(|_| unreachable!());
        }
        store
    }

    #[test]
    fn test_match_expression_quotes_words() {
        assert_eq!(
            match_expression("What is FTS5?").as_deref(),
            Some("\"What\" OR \"is\" OR \"FTS5\"")
        );
        assert_eq!(match_expression("?!  ..."), None);
    }

    #[test]
    fn test_empty_store_is_not_populated() {
        let store = store_with(&[]);
        assert!(!store.is_populated().unwrap_or(true));
        assert_eq!(store.stats().unwrap_or_default(), KnowledgeStats::default());
    }

    #[test]
    fn test_add_source_updates_stats_and_manifest() {
        let store = store_with(&[("a.md", &["one", "two"]), ("b.txt", &["three"])]);
        let stats = store.stats().unwrap_or_default();
        assert_eq!(stats, KnowledgeStats { sources: 2, chunks: 3 });
        assert!(store.has_source("a.md").unwrap_or(false));
        assert!(!store.has_source("c.md").unwrap_or(true));

        let sources = store.list_sources().unwrap_or_default();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].path, "a.md");
        assert_eq!(sources[0].chunk_count, 2);
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let store = store_with(&[("a.md", &["one"])]);
        let result = store.add_source("a.md", &["again".to_string()]);
        assert!(result.is_err());
        assert_eq!(store.stats().unwrap_or_default().chunks, 1);
    }

    #[test]
    fn test_search_finds_matching_chunks() {
        let store = store_with(&[(
            "notes.md",
            &[
                "Rust ownership rules prevent data races",
                "Gardening tips for tomatoes",
                "The borrow checker enforces ownership",
            ],
        )]);

        let results = store.search("ownership", 5).unwrap_or_default();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|c| c.content.contains("ownership")));
        assert!(results.iter().all(|c| c.source == "notes.md"));
        assert!(results.iter().all(|c| c.score.is_some()));
    }

    #[test]
    fn test_search_respects_top_k() {
        let store = store_with(&[("a.md", &["cat", "cat cat", "cat cat cat"])]);
        assert_eq!(store.search("cat", 2).unwrap_or_default().len(), 2);
        assert!(store.search("cat", 0).unwrap_or_default().is_empty());
    }

    #[test]
    fn test_search_stems_terms() {
        let store = store_with(&[("a.md", &["the runners were running"])]);
        assert_eq!(store.search("run", 5).unwrap_or_default().len(), 1);
    }

    #[test]
    fn test_search_tolerates_fts_syntax() {
        let store = store_with(&[("a.md", &["AND OR NOT near"])]);
        let results = store.search("\"AND\" OR (NOT*", 5);
        assert!(results.is_ok());
    }

    #[test]
    fn test_open_existing_missing_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let result = SqliteKnowledgeStore::open_existing(&dir.path().join("missing.db"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("nested").join("kb.db");
        let store = SqliteKnowledgeStore::open(&path).unwrap_or_else(|_| unreachable!());
        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_retriever_trait_delegates_to_search() {
        let store = store_with(&[("a.md", &["alpha beta"])]);
        let chunks = store.query("beta", 5).await.unwrap_or_default();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].position, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_queries_share_store() {
        let store = Arc::new(store_with(&[
            ("a.md", &["alpha beta", "gamma"]),
            ("b.md", &["beta delta"]),
        ]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.query("beta", 5).await })
            })
            .collect();

        for handle in handles {
            let chunks = handle
                .await
                .unwrap_or_else(|_| unreachable!())
                .unwrap_or_default();
            assert_eq!(chunks.len(), 2);
        }
    }
}
