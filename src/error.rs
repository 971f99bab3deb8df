//! Error types for rag-agent.
//!
//! Each layer has its own error enum: [`AgentError`] for the workflow and
//! its external collaborators, [`StorageError`] for the knowledge store,
//! and [`CommandError`] for the CLI and HTTP edges. [`Error`] unifies them
//! for callers that cross layers.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent or workflow failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Knowledge store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Command execution failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the agent system and its collaborators.
///
/// Individual workflow components never return these; they recover locally
/// and record a degraded state transition instead. The variants surface from
/// providers, retrievers, configuration, and the orchestrator's step budget.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured.
    #[error("API key missing: set OPENAI_API_KEY or RAG_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is unknown.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// The provider rejected or failed the request.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error description from the transport or the API.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The provider did not answer within the configured timeout.
    #[error("API request timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// A model response could not be parsed.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// Raw response content.
        content: String,
    },

    /// The knowledge retriever failed.
    #[error("retrieval failed: {message}")]
    Retrieval {
        /// Error description from the store.
        message: String,
    },

    /// A control tag did not name any workflow step.
    #[error("unknown control tag: {tag:?}")]
    UnknownControl {
        /// The rejected tag.
        tag: String,
    },

    /// The run dispatched more steps than its budget allows.
    #[error("step budget of {budget} exhausted; {summary}")]
    StepBudgetExceeded {
        /// Configured budget.
        budget: usize,
        /// Summary of the partial state at abort time.
        summary: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    Configuration {
        /// What is wrong.
        message: String,
    },
}

/// Errors raised by the SQLite knowledge store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem error while opening or ingesting.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A required path does not exist.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The connection mutex was poisoned by a panicking holder.
    #[error("knowledge store lock poisoned")]
    LockPoisoned,
}

/// Errors raised by CLI commands and the HTTP endpoint.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Generic execution failure with context.
    #[error("{0}")]
    ExecutionFailed(String),

    /// An argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The knowledge store is missing or holds no chunks.
    #[error(
        "knowledge base not found or empty at {}. Run `rag-agent ingest <dir>` first.",
        .path.display()
    )]
    KnowledgeBaseAbsent {
        /// Store path that was checked.
        path: PathBuf,
    },

    /// Output serialization failed.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}
