//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::chunking::{DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};

/// rag-agent: multi-step retrieval-augmented question answering.
///
/// Decomposes a question into sub-questions, retrieves and judges evidence
/// for each from a local knowledge base, and synthesizes a report.
#[derive(Parser, Debug)]
#[command(name = "rag-agent")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the knowledge base file.
    ///
    /// Defaults to `.rag/knowledge.db` in the current directory.
    #[arg(short, long, env = "RAG_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question from the knowledge base.
    ///
    /// Requires an OpenAI-compatible API key and a populated knowledge base.
    #[command(after_help = r#"Examples:
  rag-agent query "What causes the northern lights?"
  rag-agent query "Compare X and Y" --max-attempts 5 --top-k 8
  rag-agent --format json query "Summarize the design" | jq '.answer'
  OPENAI_API_KEY=sk-... rag-agent query "explain the auth flow"
"#)]
    Query {
        /// The question to answer.
        query: String,

        /// Chunks retrieved per attempt.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Retrieval attempts per sub-query before it is given up.
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Maximum workflow steps before the run is aborted.
        #[arg(long)]
        step_budget: Option<usize>,

        /// Model used by every agent.
        #[arg(long)]
        model: Option<String>,

        /// Directory containing prompt template files.
        #[arg(long, env = "RAG_PROMPT_DIR")]
        prompt_dir: Option<PathBuf>,
    },

    /// Ingest `.txt` and `.md` files from a directory.
    ///
    /// Files already in the knowledge base are skipped.
    #[command(after_help = r#"Examples:
  rag-agent ingest ./docs
  rag-agent ingest ./docs --chunk-size 500 --overlap 50
  rag-agent --db-path ./kb.db ingest ./notes
"#)]
    Ingest {
        /// Directory to ingest.
        dir: PathBuf,

        /// Chunk size in characters.
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Overlap between chunks in characters.
        #[arg(long, default_value_t = DEFAULT_OVERLAP)]
        overlap: usize,
    },

    /// Show knowledge base status.
    Status,

    /// Serve the query endpoint over HTTP.
    #[cfg(feature = "server")]
    #[command(after_help = r#"Examples:
  rag-agent serve                            # Listen on 127.0.0.1:8000
  rag-agent serve --host 0.0.0.0 --port 8080
  curl -s localhost:8000/query -H 'content-type: application/json' -d '{"query":"..."}'
"#)]
    Serve {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to.
        #[arg(long, default_value = "8000")]
        port: u16,
    },

    /// Score answers for a suite of queries.
    ///
    /// Reads one query per line; blank lines and `#` comments are ignored.
    #[command(after_help = r#"Examples:
  rag-agent evaluate queries.txt
  rag-agent --format json evaluate queries.txt > report.json
"#)]
    Evaluate {
        /// File of queries.
        file: PathBuf,

        /// Directory containing prompt template files.
        #[arg(long, env = "RAG_PROMPT_DIR")]
        prompt_dir: Option<PathBuf>,
    },

    /// Write the default prompt templates for customization.
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/rag-agent/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_db_path() {
        let cli = Cli {
            db_path: None,
            verbose: false,
            format: "text".to_string(),
            command: Commands::Status,
        };
        assert_eq!(
            cli.get_db_path(),
            PathBuf::from(crate::storage::DEFAULT_DB_PATH)
        );
    }

    #[test]
    fn test_custom_db_path() {
        let cli = Cli {
            db_path: Some(PathBuf::from("/custom/path.db")),
            verbose: false,
            format: "text".to_string(),
            command: Commands::Status,
        };
        assert_eq!(cli.get_db_path(), PathBuf::from("/custom/path.db"));
    }

    #[test]
    fn test_parse_query_overrides() {
        let cli = Cli::try_parse_from([
            "rag-agent",
            "query",
            "what?",
            "--top-k",
            "3",
            "--max-attempts",
            "2",
        ])
        .unwrap_or_else(|_| unreachable!());
        match cli.command {
            Commands::Query {
                query,
                top_k,
                max_attempts,
                ..
            } => {
                assert_eq!(query, "what?");
                assert_eq!(top_k, Some(3));
                assert_eq!(max_attempts, Some(2));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_ingest_defaults() {
        let cli = Cli::try_parse_from(["rag-agent", "ingest", "./docs"])
            .unwrap_or_else(|_| unreachable!());
        match cli.command {
            Commands::Ingest {
                chunk_size,
                overlap,
                ..
            } => {
                assert_eq!(chunk_size, DEFAULT_CHUNK_SIZE);
                assert_eq!(overlap, DEFAULT_OVERLAP);
            }
            _ => unreachable!(),
        }
    }
}
