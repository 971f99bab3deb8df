//! Knowledge base ingestion from a directory of text documents.
//!
//! Walks a directory tree, chunks every `.txt` and `.md` file, and stores
//! the chunks. Files already in the store's manifest are skipped, so
//! ingestion can be rerun on a growing directory.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunking::Chunker;
use crate::error::StorageError;
use crate::storage::SqliteKnowledgeStore;

/// File extensions ingested as plain text.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Outcome of an ingestion pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Files chunked and stored in this pass.
    pub files_ingested: usize,
    /// Chunks stored in this pass.
    pub chunks_stored: usize,
    /// Files skipped because the manifest already lists them.
    pub files_already_ingested: usize,
    /// Files skipped because of their extension.
    pub files_unsupported: usize,
    /// Supported files that could not be read or stored.
    pub failures: Vec<IngestFailure>,
}

/// A file that failed to ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    /// File path.
    pub path: String,
    /// Error description.
    pub error: String,
}

/// Ingests every supported file under `dir` into `store`.
///
/// # Errors
///
/// Returns [`StorageError::NotFound`] if `dir` is not a directory and
/// [`StorageError::Io`] if the tree cannot be listed. Per-file failures
/// are collected in [`IngestReport::failures`] instead.
pub fn ingest_dir(
    store: &SqliteKnowledgeStore,
    dir: &Path,
    chunker: &Chunker,
) -> Result<IngestReport, StorageError> {
    if !dir.is_dir() {
        return Err(StorageError::NotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let mut report = IngestReport::default();

    for path in files {
        if !is_supported(&path) {
            debug!(path = %path.display(), "unsupported extension, skipping");
            report.files_unsupported += 1;
            continue;
        }

        let source = path.to_string_lossy().into_owned();
        if store.has_source(&source)? {
            debug!(source, "already ingested, skipping");
            report.files_already_ingested += 1;
            continue;
        }

        match ingest_file(store, &path, &source, chunker) {
            Ok(chunks) => {
                report.files_ingested += 1;
                report.chunks_stored += chunks;
            }
            Err(e) => {
                warn!(source, error = %e, "failed to ingest file");
                report.failures.push(IngestFailure {
                    path: source,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        ingested = report.files_ingested,
        chunks = report.chunks_stored,
        skipped = report.files_already_ingested,
        unsupported = report.files_unsupported,
        failed = report.failures.len(),
        "ingestion finished"
    );
    Ok(report)
}

fn ingest_file(
    store: &SqliteKnowledgeStore,
    path: &Path,
    source: &str,
    chunker: &Chunker,
) -> Result<usize, StorageError> {
    let text = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let chunks = chunker.chunk(&text);
    store.add_source(source, &chunks)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}
