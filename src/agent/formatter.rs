//! Report formatting.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::config::AgentConfig;
use super::prompt::build_formatter_prompt;
use super::provider::LlmProvider;
use super::state::WorkflowState;
use super::traits::Agent;

/// Prefix placed before the raw draft when formatting fails.
pub const FORMATTING_FAILED_PREFIX: &str =
    "An error occurred during formatting. Here's the raw draft:\n\n";

/// Agent that polishes the draft into the final report.
pub struct Formatter {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl Formatter {
    /// Creates a formatter backed by `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }

    /// Formats `draft`. A failed call or a blank reply passes the draft
    /// through behind [`FORMATTING_FAILED_PREFIX`].
    pub async fn format(&self, draft: &str) -> String {
        match self
            .execute(self.provider.as_ref(), &build_formatter_prompt(draft))
            .await
        {
            Ok(response) if !response.content.trim().is_empty() => response.content,
            Ok(_) => {
                warn!("formatter returned an empty reply, passing draft through");
                format!("{FORMATTING_FAILED_PREFIX}{draft}")
            }
            Err(e) => {
                warn!(error = %e, "formatting failed, passing draft through");
                format!("{FORMATTING_FAILED_PREFIX}{draft}")
            }
        }
    }

    /// Runs one formatter step, completing the run.
    pub async fn run(&self, mut state: WorkflowState) -> WorkflowState {
        let draft = state.take_draft();
        let report = self.format(&draft).await;
        info!(report_len = report.len(), "report formatted");
        state.finish(report)
    }
}

#[async_trait]
impl Agent for Formatter {
    fn name(&self) -> &'static str {
        "formatter"
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
