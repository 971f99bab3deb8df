//! Concrete [`LlmProvider`](super::provider::LlmProvider) backends.

pub mod openai;

pub use openai::OpenAiProvider;
