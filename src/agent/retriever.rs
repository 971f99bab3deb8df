//! Evidence retrieval for the current sub-query.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::state::{EvidenceChunk, WorkflowState};
use crate::error::AgentError;

/// Trait for knowledge store backends.
///
/// Returns chunks in the store's rank order, at most `top_k` of them.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// Fetches evidence for `text`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Retrieval`] when the store is unavailable.
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<EvidenceChunk>, AgentError>;
}

/// Workflow component that runs one retrieval per visit.
pub struct RetrievalController {
    retriever: Arc<dyn KnowledgeRetriever>,
    top_k: usize,
}

impl RetrievalController {
    /// Creates a controller fetching up to `top_k` chunks per call.
    #[must_use]
    pub fn new(retriever: Arc<dyn KnowledgeRetriever>, top_k: usize) -> Self {
        Self { retriever, top_k }
    }

    /// Runs one retrieval step.
    ///
    /// A store failure gives up on the current sub-query without retrying.
    pub async fn run(&self, state: WorkflowState) -> WorkflowState {
        match self
            .retriever
            .query(state.current_sub_query(), self.top_k)
            .await
        {
            Ok(chunks) => {
                debug!(
                    sub_query = state.current_sub_query(),
                    attempt = state.retrieval_attempts() + 1,
                    chunks = chunks.len(),
                    "evidence retrieved"
                );
                state.record_retrieval(chunks)
            }
            Err(e) => {
                warn!(
                    sub_query = state.current_sub_query(),
                    error = %e,
                    "retrieval failed, marking sub-query unanswerable"
                );
                state.record_retrieval_failure()
            }
        }
    }
}
