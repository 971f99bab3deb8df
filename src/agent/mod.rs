//! Agentic question answering over a knowledge store.
//!
//! A run decomposes the query into sub-queries, retrieves and judges
//! evidence for each with bounded retries, then synthesizes and formats a
//! report. Language generation goes through the pluggable [`LlmProvider`]
//! and retrieval through [`KnowledgeRetriever`].
//!
//! # Architecture
//!
//! ```text
//! User query → Orchestrator (supervisor loop, step budget)
//!   ├── Decomposer         plans sub-queries, advances the cursor
//!   ├── RetrievalController fetches top-k chunks for the sub-query
//!   ├── SufficiencyEvaluator accepts, retries, or gives up
//!   ├── Synthesizer        drafts from accumulated evidence
//!   └── Formatter          polishes the draft into the report
//! ```

pub mod client;
pub mod config;
pub mod decomposer;
pub mod evaluator;
pub mod formatter;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod retriever;
pub mod state;
pub mod supervisor;
pub mod synthesizer;
#[cfg(test)]
pub(crate) mod testing;
pub mod traits;

// Re-export key types
pub use client::create_provider;
pub use config::AgentConfig;
pub use decomposer::Decomposer;
pub use evaluator::SufficiencyEvaluator;
pub use formatter::Formatter;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::{Orchestrator, RunOutcome, WorkflowRun};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use retriever::{KnowledgeRetriever, RetrievalController};
pub use state::{Control, EvidenceChunk, WorkflowState};
pub use supervisor::{ComponentId, Route};
pub use synthesizer::Synthesizer;
pub use traits::{Agent, AgentResponse};
