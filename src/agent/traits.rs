//! Agent trait definition.
//!
//! Every language-model-backed workflow component (decomposer, evaluator,
//! synthesizer, formatter) and the quality judge implement this trait, which
//! gives them a uniform way to build and send a chat request.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all LLM-backed agents.
///
/// Agents encapsulate a specific role (decomposition, judgment, synthesis,
/// formatting) with a fixed system prompt and model configuration. Workflow
/// components call [`Agent::execute`] against the provider they were built
/// with.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Executes the agent with the given user message.
    ///
    /// Builds a [`ChatRequest`] from the agent's configuration and
    /// delegates to the provider.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or timeouts.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
        };

        let response: ChatResponse = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}
