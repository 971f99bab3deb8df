//! Shared doubles for integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use rag_agent::agent::{
    AgentConfig, ChatRequest, ChatResponse, EvidenceChunk, KnowledgeRetriever, LlmProvider,
};
use rag_agent::error::AgentError;

/// Which component a request came from, read off its user-message tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Decomposer,
    Evaluator,
    Synthesizer,
    Formatter,
    FaithfulnessJudge,
    RelevanceJudge,
}

impl Caller {
    pub fn classify(user_msg: &str) -> Self {
        if user_msg.contains("<draft>") {
            Self::Formatter
        } else if user_msg.contains("<sub_query>") {
            Self::Evaluator
        } else if user_msg.contains("<unanswerable>") {
            Self::Synthesizer
        } else if user_msg.contains("<answer>") && user_msg.contains("<context>") {
            Self::FaithfulnessJudge
        } else if user_msg.contains("<answer>") {
            Self::RelevanceJudge
        } else {
            Self::Decomposer
        }
    }
}

/// Provider that answers each component with a scripted reply.
///
/// A component without a reply gets an API error.
#[derive(Default)]
pub struct ScriptedProvider {
    decomposer: Option<String>,
    evaluator: Option<String>,
    synthesizer: Option<String>,
    formatter: Option<String>,
    judge: Option<String>,
    calls: Mutex<Vec<(Caller, String)>>,
}

impl ScriptedProvider {
    /// Fails every call.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn decomposer(mut self, reply: &str) -> Self {
        self.decomposer = Some(reply.to_string());
        self
    }

    pub fn evaluator(mut self, reply: &str) -> Self {
        self.evaluator = Some(reply.to_string());
        self
    }

    pub fn synthesizer(mut self, reply: &str) -> Self {
        self.synthesizer = Some(reply.to_string());
        self
    }

    pub fn formatter(mut self, reply: &str) -> Self {
        self.formatter = Some(reply.to_string());
        self
    }

    pub fn judge(mut self, reply: &str) -> Self {
        self.judge = Some(reply.to_string());
        self
    }

    pub fn calls_from(&self, caller: Caller) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| {
                calls
                    .iter()
                    .filter(|(c, _)| *c == caller)
                    .map(|(_, msg)| msg.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let user_msg = request.user_content().unwrap_or_default().to_string();
        let caller = Caller::classify(&user_msg);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((caller, user_msg));
        }

        let reply = match caller {
            Caller::Decomposer => &self.decomposer,
            Caller::Evaluator => &self.evaluator,
            Caller::Synthesizer => &self.synthesizer,
            Caller::Formatter => &self.formatter,
            Caller::FaithfulnessJudge | Caller::RelevanceJudge => &self.judge,
        };
        reply
            .as_ref()
            .map(ChatResponse::text)
            .ok_or_else(|| AgentError::ApiRequest {
                message: "scripted provider has no reply".to_string(),
                status: Some(500),
            })
    }
}

/// What a [`ScriptedRetriever`] returns.
pub enum Retrieval {
    /// These chunk contents, on every call.
    Chunks(Vec<&'static str>),
    /// Nothing, on every call.
    Empty,
    /// An error, on every call.
    Failing,
}

/// Retriever returning the same scripted result for every query.
pub struct ScriptedRetriever {
    behavior: Retrieval,
    calls: AtomicUsize,
}

impl ScriptedRetriever {
    pub const fn new(behavior: Retrieval) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeRetriever for ScriptedRetriever {
    async fn query(&self, _text: &str, top_k: usize) -> Result<Vec<EvidenceChunk>, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Retrieval::Chunks(contents) => Ok(contents
                .iter()
                .take(top_k)
                .enumerate()
                .map(|(i, c)| EvidenceChunk::new(*c).with_source("scripted.md", i))
                .collect()),
            Retrieval::Empty => Ok(Vec::new()),
            Retrieval::Failing => Err(AgentError::Retrieval {
                message: "store offline".to_string(),
            }),
        }
    }
}

/// Test configuration with three retrieval attempts.
pub fn config() -> AgentConfig {
    AgentConfig::builder()
        .api_key("test")
        .max_retrieval_attempts(3)
        .build()
        .unwrap_or_else(|_| unreachable!())
}
