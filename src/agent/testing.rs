//! Provider double for component unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Replies with a fixed text, or fails every call when built with
/// [`StubProvider::failing`]. Records every user message it receives.
pub struct StubProvider {
    reply: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.user_content().unwrap_or_default().to_string());
        }
        self.reply
            .as_ref()
            .map(ChatResponse::text)
            .ok_or_else(|| AgentError::ApiRequest {
                message: "stub provider offline".to_string(),
                status: Some(503),
            })
    }
}
