//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default generation model.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default max tokens per completion.
const DEFAULT_MAX_TOKENS: u32 = 2048;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default retrieval attempts per sub-query before it is marked unanswerable.
pub const DEFAULT_MAX_RETRIEVAL_ATTEMPTS: u32 = 3;
/// Default global cap on supervisor dispatches per run.
pub const DEFAULT_STEP_BUDGET: usize = 200;
/// Default number of chunks fetched per retrieval call.
pub const DEFAULT_RETRIEVAL_TOP_K: usize = 5;

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model used by every agent in the workflow.
    pub model: String,
    /// Sampling temperature for generation calls.
    pub temperature: f32,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
    /// Retrieval attempts allowed per sub-query.
    ///
    /// Once a sub-query has been retrieved this many times without a
    /// positive sufficiency verdict it is recorded as unanswerable.
    pub max_retrieval_attempts: u32,
    /// Default step budget for [`Orchestrator::run`](super::Orchestrator::run) callers.
    pub step_budget: usize,
    /// Chunks requested from the knowledge retriever per call.
    pub retrieval_top_k: usize,
    /// Directory containing prompt template files.
    ///
    /// When set, the agent system loads system prompts from markdown files
    /// in this directory, falling back to compiled-in defaults for any
    /// missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
    max_retrieval_attempts: Option<u32>,
    step_budget: Option<usize>,
    retrieval_top_k: Option<usize>,
    prompt_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("RAG_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("RAG_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("RAG_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("RAG_MODEL").ok();
        }
        if self.temperature.is_none() {
            self.temperature = env_parse("RAG_TEMPERATURE");
        }
        if self.max_tokens.is_none() {
            self.max_tokens = env_parse("RAG_MAX_TOKENS");
        }
        if self.max_retrieval_attempts.is_none() {
            self.max_retrieval_attempts = env_parse("RAG_MAX_RETRIEVAL_ATTEMPTS");
        }
        if self.step_budget.is_none() {
            self.step_budget = env_parse("RAG_STEP_BUDGET");
        }
        if self.retrieval_top_k.is_none() {
            self.retrieval_top_k = env_parse("RAG_RETRIEVAL_TOP_K");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("RAG_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the generation model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the max tokens per completion.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the retrieval attempts allowed per sub-query.
    #[must_use]
    pub const fn max_retrieval_attempts(mut self, n: u32) -> Self {
        self.max_retrieval_attempts = Some(n);
        self
    }

    /// Sets the default step budget.
    #[must_use]
    pub const fn step_budget(mut self, n: usize) -> Self {
        self.step_budget = Some(n);
        self
    }

    /// Sets the retrieval top-k.
    #[must_use]
    pub const fn retrieval_top_k(mut self, n: usize) -> Self {
        self.retrieval_top_k = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set, or
    /// [`AgentError::Configuration`] if a bound is zero.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        let max_retrieval_attempts = self
            .max_retrieval_attempts
            .unwrap_or(DEFAULT_MAX_RETRIEVAL_ATTEMPTS);
        let step_budget = self.step_budget.unwrap_or(DEFAULT_STEP_BUDGET);
        let retrieval_top_k = self.retrieval_top_k.unwrap_or(DEFAULT_RETRIEVAL_TOP_K);

        for (name, value) in [
            ("max_retrieval_attempts", max_retrieval_attempts as usize),
            ("step_budget", step_budget),
            ("retrieval_top_k", retrieval_top_k),
        ] {
            if value == 0 {
                return Err(AgentError::Configuration {
                    message: format!("{name} must be at least 1"),
                });
            }
        }

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(0.0),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retrieval_attempts,
            step_budget,
            retrieval_top_k,
            prompt_dir: self.prompt_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_retrieval_attempts, DEFAULT_MAX_RETRIEVAL_ATTEMPTS);
        assert_eq!(config.step_budget, DEFAULT_STEP_BUDGET);
        assert_eq!(config.retrieval_top_k, DEFAULT_RETRIEVAL_TOP_K);
        assert!(config.prompt_dir.is_none());
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .provider("custom")
            .model("gpt-4o")
            .max_retrieval_attempts(5)
            .step_budget(50)
            .retrieval_top_k(8)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "custom");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_retrieval_attempts, 5);
        assert_eq!(config.step_budget, 50);
        assert_eq!(config.retrieval_top_k, 8);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_rejects_zero_bounds() {
        let result = AgentConfig::builder()
            .api_key("key")
            .max_retrieval_attempts(0)
            .build();
        assert!(matches!(result, Err(AgentError::Configuration { .. })));

        let result = AgentConfig::builder().api_key("key").step_budget(0).build();
        assert!(matches!(result, Err(AgentError::Configuration { .. })));
    }
}
