//! Sufficiency evaluation and the per-sub-query retry loop.
//!
//! After each retrieval the evaluator asks the model whether the chunks
//! answer the current sub-query, then either accepts them, sends the run
//! back for another retrieval, or gives up on the sub-query once its
//! attempts are spent.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::prompt::build_evaluator_prompt;
use super::provider::LlmProvider;
use super::state::{WorkflowState, join_contents};
use super::traits::Agent;

/// Feedback when a retrieval returned nothing.
pub const NO_EVIDENCE_FEEDBACK: &str = "No evidence retrieved.";
/// Feedback when the model gave no reason for an insufficient verdict.
pub const DEFAULT_FEEDBACK: &str = "Information insufficient.";
/// Feedback when the judgment call itself failed.
pub const EVALUATION_FAILED_FEEDBACK: &str =
    "LLM evaluation failed. Assuming insufficient for retry.";

// Matches anywhere in the reply, markdown emphasis included.
static SUFFICIENCY_VERDICT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)SUFFICIENCY\s*\**\s*:\s*\**\s*(\w+)").ok());

static FEEDBACK_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*FEEDBACK\s*:(.*)$").ok());

/// A parsed sufficiency judgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the evidence answers the sub-query.
    pub sufficient: bool,
    /// Reason for an insufficient verdict. Empty when sufficient.
    pub feedback: String,
}

impl Verdict {
    fn insufficient(feedback: &str) -> Self {
        Self {
            sufficient: false,
            feedback: feedback.to_string(),
        }
    }
}

/// Parses a `SUFFICIENCY:` / `FEEDBACK:` reply.
///
/// Only an explicit `YES` counts as sufficient, wherever the verdict sits
/// in the reply and with or without markdown emphasis. Matching is
/// case-insensitive; feedback keeps the model's original casing.
#[must_use]
pub fn parse_verdict(content: &str) -> Verdict {
    let sufficient = SUFFICIENCY_VERDICT
        .as_ref()
        .and_then(|re| re.captures(content))
        .and_then(|caps| caps.get(1))
        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("yes"));

    if sufficient {
        return Verdict {
            sufficient: true,
            feedback: String::new(),
        };
    }

    let feedback = FEEDBACK_LINE
        .as_ref()
        .and_then(|re| re.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FEEDBACK);

    Verdict::insufficient(feedback)
}

/// Agent that judges whether retrieved evidence suffices.
pub struct SufficiencyEvaluator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    max_attempts: u32,
    system_prompt: String,
}

impl SufficiencyEvaluator {
    /// Creates an evaluator backed by `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_attempts: config.max_retrieval_attempts,
            system_prompt,
        }
    }

    /// Judges the chunks retrieved for the current sub-query.
    ///
    /// Never fails: an empty retrieval or a failed call is reported as an
    /// insufficient verdict.
    pub async fn judge(&self, state: &WorkflowState) -> Verdict {
        if state.retrieved_chunks().is_empty() {
            return Verdict::insufficient(NO_EVIDENCE_FEEDBACK);
        }

        let evidence = join_contents(state.retrieved_chunks());
        let user_msg = build_evaluator_prompt(state.current_sub_query(), &evidence);

        match self.execute(self.provider.as_ref(), &user_msg).await {
            Ok(response) => parse_verdict(&response.content),
            Err(e) => {
                warn!(error = %e, "sufficiency judgment failed");
                Verdict::insufficient(EVALUATION_FAILED_FEEDBACK)
            }
        }
    }

    /// Runs one evaluator step.
    pub async fn run(&self, state: WorkflowState) -> WorkflowState {
        let verdict = self.judge(&state).await;
        debug!(
            sub_query = state.current_sub_query(),
            sufficient = verdict.sufficient,
            feedback = %verdict.feedback,
            "evidence judged"
        );

        let state = state.record_verdict(verdict.sufficient, verdict.feedback);

        if state.sufficiency() {
            info!(sub_query = state.current_sub_query(), "sub-query answered");
            state.accept_evidence()
        } else if state.retrieval_attempts() < self.max_attempts {
            debug!(
                attempt = state.retrieval_attempts(),
                max = self.max_attempts,
                "retrying retrieval"
            );
            state.request_retry()
        } else {
            info!(
                sub_query = state.current_sub_query(),
                attempts = state.retrieval_attempts(),
                "retrieval attempts exhausted, sub-query unanswerable"
            );
            state.mark_unanswerable()
        }
    }
}

#[async_trait]
impl Agent for SufficiencyEvaluator {
    fn name(&self) -> &'static str {
        "evaluator"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
