//! Output formatting for CLI commands.
//!
//! Every command renders either human-readable text or pretty JSON.

#![allow(clippy::format_push_string)]

use std::fmt::Write;
use std::path::Path;

use serde::Serialize;

use crate::agent::orchestrator::{RunOutcome, WorkflowRun};
use crate::error::CommandError;
use crate::evaluation::{EvaluationReport, RecordStatus};
use crate::ingest::IngestReport;
use crate::storage::{KnowledgeStats, SourceRecord};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name, defaulting to text for unknown names.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::OutputFormat`] if `value` cannot be serialized.
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> Result<String, CommandError> {
        let mut out = serde_json::to_string_pretty(value)
            .map_err(|e| CommandError::OutputFormat(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }
}

/// Formats knowledge base status.
pub fn format_status(
    db_path: &Path,
    stats: &KnowledgeStats,
    sources: &[SourceRecord],
    format: OutputFormat,
) -> Result<String, CommandError> {
    match format {
        OutputFormat::Text => {
            let mut output = format!("Knowledge base: {}\n", db_path.display());
            output.push_str(&format!("  Sources: {}\n", stats.sources));
            output.push_str(&format!("  Chunks:  {}\n", stats.chunks));
            if !sources.is_empty() {
                output.push('\n');
                for source in sources {
                    let _ = writeln!(
                        output,
                        "  {:<48} {:>5} chunks  {}",
                        source.path, source.chunk_count, source.ingested_at
                    );
                }
            }
            Ok(output)
        }
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "path": db_path.to_string_lossy(),
            "sources": stats.sources,
            "chunks": stats.chunks,
            "manifest": sources,
        })),
    }
}

/// Formats an ingestion report.
pub fn format_ingest_report(
    dir: &Path,
    report: &IngestReport,
    format: OutputFormat,
) -> Result<String, CommandError> {
    match format {
        OutputFormat::Text => {
            let mut output = format!(
                "Ingested {} file(s), {} chunk(s) from: {}\n",
                report.files_ingested,
                report.chunks_stored,
                dir.display()
            );
            if report.files_already_ingested > 0 {
                output.push_str(&format!(
                    "  Skipped {} already-ingested file(s)\n",
                    report.files_already_ingested
                ));
            }
            if report.files_unsupported > 0 {
                output.push_str(&format!(
                    "  Skipped {} unsupported file(s)\n",
                    report.files_unsupported
                ));
            }
            for failure in &report.failures {
                output.push_str(&format!("  Failed: {} ({})\n", failure.path, failure.error));
            }
            Ok(output)
        }
        OutputFormat::Json => format.to_json(report),
    }
}

/// Formats a workflow run.
pub fn format_run(
    run: &WorkflowRun,
    format: OutputFormat,
    verbose: bool,
) -> Result<String, CommandError> {
    match format {
        OutputFormat::Text => {
            let mut output = match &run.outcome {
                RunOutcome::Completed { final_report } => final_report.clone(),
                RunOutcome::Failed { error } => format!("Run failed: {error}"),
            };
            let state = &run.state;
            output.push_str(&format!(
                "\n\n---\nSub-queries: {} | Evidence: {} chunks | Unanswerable: {} | Steps: {} | Time: {:.1}s",
                state.sub_queries().len(),
                state.accumulated_evidence().len(),
                state.unanswerable_sub_queries().len(),
                run.steps,
                run.elapsed.as_secs_f64()
            ));
            if verbose {
                for (i, sub_query) in state.sub_queries().iter().enumerate() {
                    output.push_str(&format!("\n  [{}] {sub_query}", i + 1));
                }
                for sub_query in state.unanswerable_sub_queries() {
                    output.push_str(&format!("\nUnanswerable: {sub_query}"));
                }
                for chunk in state.accumulated_evidence() {
                    output.push_str(&format!("\nSource: {}#{}", chunk.source, chunk.position));
                }
            }
            output.push('\n');
            Ok(output)
        }
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "answer": run.answer(),
            "error": match &run.outcome {
                RunOutcome::Failed { error } => Some(error.as_str()),
                RunOutcome::Completed { .. } => None,
            },
            "sub_queries": run.state.sub_queries(),
            "unanswerable_sub_queries": run.state.unanswerable_sub_queries(),
            "evidence": run.state.accumulated_evidence(),
            "steps": run.steps,
            "elapsed_ms": u64::try_from(run.elapsed.as_millis()).unwrap_or(u64::MAX),
        })),
    }
}

/// Formats an evaluation report.
pub fn format_evaluation(
    report: &EvaluationReport,
    format: OutputFormat,
) -> Result<String, CommandError> {
    match format {
        OutputFormat::Text => {
            let score = |s: Option<u8>| s.map_or_else(|| "-".to_string(), |v| v.to_string());
            let mut output = String::new();
            for record in &report.records {
                let status = match record.status {
                    RecordStatus::Success => "ok",
                    RecordStatus::Failed => "failed",
                    RecordStatus::EvaluationError => "eval-error",
                };
                output.push_str(&format!(
                    "[{status:<10}] faithfulness {:>2} | relevance {:>2} | contexts {:>3} | {}\n",
                    score(record.faithfulness_score),
                    score(record.answer_relevance_score),
                    record.retrieved_contexts_count,
                    record.query
                ));
            }
            let avg = |a: Option<f64>| a.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
            output.push_str(&format!(
                "\nQueries: {} | Success: {} | Failed: {} | Eval errors: {}\n",
                report.records.len(),
                report.count(RecordStatus::Success),
                report.count(RecordStatus::Failed),
                report.count(RecordStatus::EvaluationError)
            ));
            output.push_str(&format!(
                "Average faithfulness: {} | Average answer relevance: {}\n",
                avg(report.average_faithfulness),
                avg(report.average_answer_relevance)
            ));
            Ok(output)
        }
        OutputFormat::Json => format.to_json(report),
    }
}
