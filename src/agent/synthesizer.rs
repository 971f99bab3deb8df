//! Synthesizer agent for drafting the answer.
//!
//! Merges the accumulated evidence into a draft that addresses the
//! original query and acknowledges unanswerable sub-queries. Never fails:
//! an empty evidence set or a failed model call yields a templated draft.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::config::AgentConfig;
use super::prompt::build_synthesizer_prompt;
use super::provider::LlmProvider;
use super::state::{WorkflowState, join_contents};
use super::traits::Agent;

/// Evidence characters quoted in the failure fallback.
const FALLBACK_EVIDENCE_CHARS: usize = 500;

/// Agent that synthesizes accumulated evidence into a draft answer.
pub struct Synthesizer {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl Synthesizer {
    /// Creates a synthesizer backed by `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }

    /// Produces a draft answer for `state`.
    pub async fn synthesize(&self, state: &WorkflowState) -> String {
        let query = state.original_query();
        let unanswerable = state.unanswerable_sub_queries();

        if state.accumulated_evidence().is_empty() {
            info!("no evidence accumulated, returning apology");
            return no_evidence_answer(query, unanswerable);
        }

        let evidence = join_contents(state.accumulated_evidence());
        let user_msg = build_synthesizer_prompt(query, &evidence, unanswerable);

        match self.execute(self.provider.as_ref(), &user_msg).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(error = %e, "synthesis failed, returning partial evidence");
                synthesis_failed_answer(&evidence, unanswerable)
            }
        }
    }

    /// Runs one synthesizer step.
    pub async fn run(&self, state: WorkflowState) -> WorkflowState {
        let draft = self.synthesize(&state).await;
        info!(
            evidence = state.accumulated_evidence().len(),
            unanswerable = state.unanswerable_sub_queries().len(),
            draft_len = draft.len(),
            "draft synthesized"
        );
        state.set_draft(draft)
    }
}

/// Draft returned when no evidence was accepted.
#[must_use]
pub fn no_evidence_answer(query: &str, unanswerable: &[String]) -> String {
    let mut answer = format!(
        "I could not find sufficient information in the knowledge base to answer your query: {query}"
    );
    if !unanswerable.is_empty() {
        answer.push_str(" (Specifically, could not answer sub-queries: ");
        answer.push_str(&unanswerable.join(", "));
        answer.push(')');
    }
    answer
}

/// Draft returned when the synthesis call fails.
#[must_use]
pub fn synthesis_failed_answer(evidence: &str, unanswerable: &[String]) -> String {
    let mut answer = String::from(
        "An error occurred during synthesis. I might not be able to provide a full answer.",
    );
    answer.push_str("\n\nBased on available information, but potentially unrefined: ");
    answer.push_str(truncate_chars(evidence, FALLBACK_EVIDENCE_CHARS));
    answer.push_str("...");
    if !unanswerable.is_empty() {
        answer.push_str("\n\nCould not answer specific parts: ");
        answer.push_str(&unanswerable.join(", "));
    }
    answer
}

/// Returns at most `max` characters of `s`, cut on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    s.char_indices().nth(max).map_or(s, |(idx, _)| &s[..idx])
}

#[async_trait]
impl Agent for Synthesizer {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::{Control, EvidenceChunk};
    use crate::agent::testing::StubProvider;

    fn synthesizer(provider: Arc<StubProvider>) -> Synthesizer {
        let config = AgentConfig::builder()
            .api_key("test")
            .temperature(0.3)
            .build()
            .unwrap_or_else(|_| unreachable!());
        Synthesizer::new(provider, &config, "synthesize".to_string())
    }

    fn with_evidence(contents: &[&str], unanswerable: &[&str]) -> WorkflowState {
        let mut subs: Vec<String> = contents.iter().map(|c| format!("about {c}")).collect();
        subs.extend(unanswerable.iter().map(ToString::to_string));
        let mut state = WorkflowState::new("original").begin_plan(subs).focus();
        for content in contents {
            state = state
                .record_retrieval(vec![EvidenceChunk::new(*content)])
                .accept_evidence()
                .focus();
        }
        for _ in unanswerable {
            state = state.record_retrieval(Vec::new()).mark_unanswerable().focus();
        }
        state
    }

    #[test]
    fn test_no_evidence_answer_lists_gaps() {
        let answer = no_evidence_answer("q?", &["a".to_string(), "b".to_string()]);
        assert_eq!(
            answer,
            "I could not find sufficient information in the knowledge base to answer your query: q? \
             (Specifically, could not answer sub-queries: a, b)"
        );
    }

    #[test]
    fn test_no_evidence_answer_without_gaps() {
        let answer = no_evidence_answer("q?", &[]);
        assert!(!answer.contains("Specifically"));
    }

    #[test]
    fn test_failure_answer_truncates_evidence() {
        let evidence = "é".repeat(800);
        let answer = synthesis_failed_answer(&evidence, &[]);
        assert!(answer.ends_with(&format!("{}...", "é".repeat(500))));
        assert!(!answer.contains(&"é".repeat(501)));
    }

    #[tokio::test]
    async fn test_empty_evidence_skips_model() {
        let provider = Arc::new(StubProvider::replying("draft"));
        let synthesizer = synthesizer(Arc::clone(&provider));
        let state = synthesizer.run(with_evidence(&[], &["gap"])).await;

        assert_eq!(provider.call_count(), 0);
        assert!(state.draft_answer().contains("original"));
        assert!(state.draft_answer().contains("gap"));
        assert_eq!(state.control(), Control::Format);
    }

    #[tokio::test]
    async fn test_model_draft_is_used() {
        let provider = Arc::new(StubProvider::replying("the draft"));
        let synthesizer = synthesizer(Arc::clone(&provider));
        let state = synthesizer.run(with_evidence(&["fact"], &["gap"])).await;

        assert_eq!(state.draft_answer(), "the draft");
        let calls = provider.calls.lock().map(|c| c.clone()).unwrap_or_default();
        assert!(calls[0].contains("- gap"));
        assert!(calls[0].contains("fact"));
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_evidence() {
        let provider = Arc::new(StubProvider::failing());
        let synthesizer = synthesizer(provider);
        let state = synthesizer.run(with_evidence(&["fact one"], &[])).await;

        assert!(state.draft_answer().starts_with("An error occurred during synthesis."));
        assert!(state.draft_answer().contains("fact one..."));
        assert_eq!(state.control(), Control::Format);
    }
}
