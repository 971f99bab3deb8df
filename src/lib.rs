//! # rag-agent
//!
//! Multi-step retrieval-augmented question answering over a local
//! knowledge base.
//!
//! A query runs through a supervised workflow: it is decomposed into
//! sub-queries, evidence is retrieved for each and judged for sufficiency
//! with a bounded number of retries, and the accepted evidence is
//! synthesized and formatted into a report. Sub-queries that never get
//! sufficient evidence are named in the report instead of failing the run.
//!
//! ## Layout
//!
//! - [`agent`]: workflow state, supervisor routing, components, and the
//!   LLM provider seam
//! - [`storage`]: SQLite FTS5 knowledge store
//! - [`chunking`] and [`ingest`]: turning a directory of documents into
//!   stored chunks
//! - [`evaluation`]: LLM-judged answer quality scoring
//! - [`cli`]: command-line interface
//! - `server`: HTTP endpoint (feature `server`)
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rag_agent::agent::{AgentConfig, Orchestrator, create_provider};
//! use rag_agent::storage::SqliteKnowledgeStore;
//!
//! # async fn demo() -> rag_agent::Result<()> {
//! let config = AgentConfig::from_env()?;
//! let provider = Arc::from(create_provider(&config)?);
//! let store = Arc::new(SqliteKnowledgeStore::open(std::path::Path::new(".rag/knowledge.db"))?);
//! let orchestrator = Orchestrator::new(provider, store, &config);
//! let run = orchestrator.run("What causes the aurora?", config.step_budget).await;
//! println!("{}", run.answer().unwrap_or("no answer"));
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod error;
pub mod evaluation;
pub mod ingest;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;

pub use error::{Error, Result};
