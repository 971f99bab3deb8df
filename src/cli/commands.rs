//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Async work runs on a
//! tokio runtime created per command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agent::client::create_provider;
use crate::agent::config::{AgentConfig, AgentConfigBuilder};
use crate::agent::orchestrator::{Orchestrator, RunOutcome};
use crate::agent::prompt::PromptSet;
use crate::agent::provider::LlmProvider;
use crate::chunking::Chunker;
use crate::cli::output::{
    OutputFormat, format_evaluation, format_ingest_report, format_run, format_status,
};
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, Result};
use crate::evaluation::{QualityEvaluator, parse_query_file};
use crate::ingest::ingest_dir;
use crate::storage::SqliteKnowledgeStore;

/// Parameters for the query command.
#[derive(Debug, Clone, Default)]
pub struct QueryCommandParams<'a> {
    /// The question to answer.
    pub query: &'a str,
    /// Chunks retrieved per attempt.
    pub top_k: Option<usize>,
    /// Retrieval attempts per sub-query.
    pub max_attempts: Option<u32>,
    /// Step budget for the run.
    pub step_budget: Option<usize>,
    /// Model override.
    pub model: Option<&'a str>,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<&'a Path>,
    /// Show sub-queries and evidence sources.
    pub verbose: bool,
}

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Query {
            query,
            top_k,
            max_attempts,
            step_budget,
            model,
            prompt_dir,
        } => {
            let params = QueryCommandParams {
                query,
                top_k: *top_k,
                max_attempts: *max_attempts,
                step_budget: *step_budget,
                model: model.as_deref(),
                prompt_dir: prompt_dir.as_deref(),
                verbose: cli.verbose,
            };
            cmd_query(&db_path, &params, format)
        }
        Commands::Ingest {
            dir,
            chunk_size,
            overlap,
        } => cmd_ingest(&db_path, dir, *chunk_size, *overlap, format),
        Commands::Status => cmd_status(&db_path, format),
        #[cfg(feature = "server")]
        Commands::Serve { host, port } => cmd_serve(&db_path, host, *port),
        Commands::Evaluate { file, prompt_dir } => {
            cmd_evaluate(&db_path, file, prompt_dir.as_deref(), format)
        }
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Opens the knowledge base, failing if it is missing or empty.
///
/// # Errors
///
/// Returns [`CommandError::KnowledgeBaseAbsent`] when no store exists at
/// `db_path` or it holds no chunks.
pub fn open_populated_store(db_path: &Path) -> Result<SqliteKnowledgeStore> {
    let absent = || CommandError::KnowledgeBaseAbsent {
        path: db_path.to_path_buf(),
    };

    if !db_path.exists() {
        return Err(absent().into());
    }
    let store = SqliteKnowledgeStore::open(db_path)?;
    if !store.is_populated()? {
        return Err(absent().into());
    }
    Ok(store)
}

/// Resolves agent configuration from the environment.
///
/// # Errors
///
/// Returns [`CommandError::ExecutionFailed`] when the configuration is
/// incomplete or invalid.
pub fn build_config(builder: AgentConfigBuilder) -> Result<AgentConfig> {
    builder.from_env().build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into()
    })
}

fn build_provider(config: &AgentConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider = create_provider(config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;
    Ok(Arc::from(provider))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

// ==================== Command Implementations ====================

fn cmd_query(db_path: &Path, params: &QueryCommandParams<'_>, format: OutputFormat) -> Result<String> {
    if params.query.trim().is_empty() {
        return Err(CommandError::InvalidArgument("query cannot be empty".to_string()).into());
    }

    let store = Arc::new(open_populated_store(db_path)?);

    let mut builder = AgentConfig::builder();
    if let Some(k) = params.top_k {
        builder = builder.retrieval_top_k(k);
    }
    if let Some(n) = params.max_attempts {
        builder = builder.max_retrieval_attempts(n);
    }
    if let Some(n) = params.step_budget {
        builder = builder.step_budget(n);
    }
    if let Some(model) = params.model {
        builder = builder.model(model);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = build_config(builder)?;
    let provider = build_provider(&config)?;

    let orchestrator = Orchestrator::new(provider, store, &config);
    let run = runtime()?.block_on(orchestrator.run(params.query, config.step_budget));

    if let RunOutcome::Failed { error } = &run.outcome
        && format == OutputFormat::Text
    {
        return Err(CommandError::ExecutionFailed(format!("Query failed: {error}")).into());
    }

    Ok(format_run(&run, format, params.verbose)?)
}

fn cmd_ingest(
    db_path: &Path,
    dir: &Path,
    chunk_size: usize,
    overlap: usize,
    format: OutputFormat,
) -> Result<String> {
    let chunker = Chunker::new(chunk_size, overlap)?;
    let store = SqliteKnowledgeStore::open(db_path)?;
    let report = ingest_dir(&store, dir, &chunker)?;
    Ok(format_ingest_report(dir, &report, format)?)
}

fn cmd_status(db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = SqliteKnowledgeStore::open_existing(db_path)
        .map_err(|_| CommandError::KnowledgeBaseAbsent {
            path: db_path.to_path_buf(),
        })?;
    let stats = store.stats()?;
    let sources = store.list_sources()?;
    Ok(format_status(db_path, &stats, &sources, format)?)
}

#[cfg(feature = "server")]
fn cmd_serve(db_path: &Path, host: &str, port: u16) -> Result<String> {
    use crate::server::{AppState, serve};

    let store = Arc::new(SqliteKnowledgeStore::open(db_path)?);
    let config = build_config(AgentConfig::builder())?;
    let provider = build_provider(&config)?;
    let orchestrator = Arc::new(Orchestrator::new(provider, Arc::clone(&store) as _, &config));
    let state = AppState::new(orchestrator, store, config.step_budget);

    runtime()?
        .block_on(serve(state, host, port))
        .map_err(|e| CommandError::ExecutionFailed(format!("HTTP server error: {e}")))?;

    Ok(String::new())
}

fn cmd_evaluate(
    db_path: &Path,
    file: &Path,
    prompt_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let content = std::fs::read_to_string(file).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to read {}: {e}", file.display()))
    })?;
    let queries = parse_query_file(&content);
    if queries.is_empty() {
        return Err(CommandError::InvalidArgument(format!(
            "no queries found in {}",
            file.display()
        ))
        .into());
    }

    let store = Arc::new(open_populated_store(db_path)?);

    let mut builder = AgentConfig::builder();
    if let Some(dir) = prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = build_config(builder)?;
    let provider = build_provider(&config)?;
    let prompts = PromptSet::load(config.prompt_dir.as_deref());

    let orchestrator = Arc::new(Orchestrator::with_prompts(
        Arc::clone(&provider),
        store,
        &config,
        prompts.clone(),
    ));
    let evaluator = QualityEvaluator::new(orchestrator, provider, &config, &prompts);
    let report = runtime()?.block_on(evaluator.evaluate(&queries));

    Ok(format_evaluation(&report, format)?)
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str("  ");
                output.push_str(
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown"),
                );
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "directory": target_dir.to_string_lossy(),
            "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
            "count": written.len()
        }))?),
    }
}
