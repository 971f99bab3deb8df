//! Query decomposition and sub-query cursor management.
//!
//! On the first visit of a run the decomposer asks the model to split the
//! original query into sub-queries. Every visit then points the run at the
//! sub-query under the cursor, or hands off to synthesis when none remain.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::prompt::build_decomposer_prompt;
use super::provider::LlmProvider;
use super::state::WorkflowState;
use super::traits::Agent;
use crate::error::AgentError;

/// Agent that plans sub-queries for a run.
pub struct Decomposer {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl Decomposer {
    /// Creates a decomposer backed by `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }

    /// Splits `query` into sub-queries.
    ///
    /// Falls back to `[query]` when the model call fails or its reply is
    /// not a non-empty JSON list of strings.
    pub async fn decompose(&self, query: &str) -> Vec<String> {
        let response = match self
            .execute(self.provider.as_ref(), &build_decomposer_prompt(query))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "decomposition call failed, using original query");
                return vec![query.to_string()];
            }
        };

        match parse_sub_queries(&response.content) {
            Ok(sub_queries) => sub_queries,
            Err(e) => {
                warn!(error = %e, "decomposition reply unusable, using original query");
                vec![query.to_string()]
            }
        }
    }

    /// Runs one decomposer step.
    pub async fn run(&self, state: WorkflowState) -> WorkflowState {
        let state = if state.is_planned() {
            state
        } else {
            let sub_queries = self.decompose(state.original_query()).await;
            info!(count = sub_queries.len(), "query decomposed");
            state.begin_plan(sub_queries)
        };

        let state = state.focus();
        debug!(
            index = state.sub_query_index(),
            total = state.sub_queries().len(),
            next = %state.control(),
            "cursor positioned"
        );
        state
    }
}

/// Parses a decomposition reply into trimmed, non-blank sub-queries.
///
/// Accepts a bare JSON array or one wrapped in a markdown code block.
///
/// # Errors
///
/// Returns [`AgentError::ResponseParse`] when the reply is not a JSON list
/// of strings or holds no non-blank entries.
pub fn parse_sub_queries(content: &str) -> Result<Vec<String>, AgentError> {
    let json_str = strip_code_fence(content);

    let items: Vec<String> =
        serde_json::from_str(json_str).map_err(|e| AgentError::ResponseParse {
            message: format!("expected a JSON list of strings: {e}"),
            content: content.to_string(),
        })?;

    let sub_queries: Vec<String> = items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if sub_queries.is_empty() {
        return Err(AgentError::ResponseParse {
            message: "decomposition produced no sub-queries".to_string(),
            content: content.to_string(),
        });
    }

    Ok(sub_queries)
}

/// Removes a surrounding markdown code block, if present.
pub(crate) fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    }
}

#[async_trait]
impl Agent for Decomposer {
    fn name(&self) -> &'static str {
        "decomposer"
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

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_parse_plain_array() {
        let parsed = parse_sub_queries(r#"["a", "b"]"#).unwrap_or_default();
        assert_eq!(parsed, ["a", "b"]);
    }

    #[test]
    fn test_parse_fenced_array() {
        let parsed = parse_sub_queries("```json\n[\"What is X?\", \"How does X work?\"]\n```")
            .unwrap_or_default();
        assert_eq!(parsed, ["What is X?", "How does X work?"]);
    }

    #[test]
    fn test_parse_bare_fence() {
        let parsed = parse_sub_queries("```\n[\"only\"]\n```").unwrap_or_default();
        assert_eq!(parsed, ["only"]);
    }

    #[test]
    fn test_parse_trims_and_drops_blank() {
        let parsed = parse_sub_queries(r#"["  a  ", "", "   ", "b"]"#).unwrap_or_default();
        assert_eq!(parsed, ["a", "b"]);
    }

    #[test_case("not json" ; "prose")]
    #[test_case("[]" ; "empty list")]
    #[test_case(r#"["", " "]"# ; "only blanks")]
    #[test_case(r#"{"sub_queries": ["a"]}"# ; "object")]
    #[test_case("[1, 2]" ; "numbers")]
    fn test_parse_rejects(content: &str) {
        assert!(matches!(
            parse_sub_queries(content),
            Err(AgentError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_strip_code_fence_passthrough() {
        assert_eq!(strip_code_fence("  [\"a\"]  "), "[\"a\"]");
    }
}
