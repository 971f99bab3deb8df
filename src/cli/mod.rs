//! CLI layer for rag-agent.
//!
//! Provides the command-line interface using clap, with commands for
//! ingesting documents, inspecting the knowledge base, answering queries,
//! and evaluating answer quality.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
