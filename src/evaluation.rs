//! Offline answer-quality evaluation.
//!
//! Runs the workflow for a list of queries and asks a judge model to score
//! each answer for faithfulness (against the evidence the run accepted)
//! and answer relevance (against the query), on a 1 to 10 scale.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::agent::config::AgentConfig;
use crate::agent::orchestrator::Orchestrator;
use crate::agent::prompt::{PromptSet, build_faithfulness_prompt, build_relevance_prompt};
use crate::agent::provider::LlmProvider;
use crate::agent::state::join_contents;
use crate::agent::traits::Agent;
use crate::error::AgentError;

static SCORE_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*SCORE\s*:\s*\[*\s*(\d+)").ok());

static REASONING_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?ims)^\s*REASONING\s*:\s*(.*)").ok());

/// A judge's score and its stated reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeScore {
    /// Score from 1 to 10.
    pub score: u8,
    /// Judge's explanation.
    pub reasoning: String,
}

/// Parses a `SCORE:` / `REASONING:` reply.
///
/// # Errors
///
/// Returns [`AgentError::ResponseParse`] when no score line is present or
/// the score is outside 1 to 10.
pub fn parse_score(content: &str) -> Result<JudgeScore, AgentError> {
    let parse_err = |message: &str| AgentError::ResponseParse {
        message: message.to_string(),
        content: content.to_string(),
    };

    let score: u8 = SCORE_LINE
        .as_ref()
        .and_then(|re| re.captures(content))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| parse_err("missing SCORE line"))?;

    if !(1..=10).contains(&score) {
        return Err(parse_err("score outside 1-10"));
    }

    let reasoning = REASONING_LINE
        .as_ref()
        .and_then(|re| re.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    Ok(JudgeScore { score, reasoning })
}

/// Judgment criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Criterion {
    Faithfulness,
    Relevance,
}

/// LLM judge for one criterion.
struct Judge {
    criterion: Criterion,
    provider: Arc<dyn LlmProvider>,
    model: String,
    system_prompt: String,
}

impl Judge {
    async fn score(&self, user_msg: &str) -> Result<JudgeScore, AgentError> {
        let response = self.execute(self.provider.as_ref(), user_msg).await?;
        parse_score(&response.content)
    }
}

#[async_trait]
impl Agent for Judge {
    fn name(&self) -> &'static str {
        match self.criterion {
            Criterion::Faithfulness => "faithfulness-judge",
            Criterion::Relevance => "relevance-judge",
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        512
    }
}

/// Evaluation status of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Answer generated and scored.
    Success,
    /// The run produced no answer.
    Failed,
    /// Answer generated but judging failed.
    EvaluationError,
}

/// Evaluation result for one query.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRecord {
    /// Evaluated query.
    pub query: String,
    /// Final report, empty when the run failed.
    pub generated_answer: String,
    /// Evidence chunks the run accepted.
    pub retrieved_contexts_count: usize,
    /// Sub-queries the run could not answer.
    pub unanswerable_sub_queries: Vec<String>,
    /// Faithfulness score.
    pub faithfulness_score: Option<u8>,
    /// Faithfulness reasoning, or the judging error.
    pub faithfulness_reasoning: Option<String>,
    /// Answer relevance score.
    pub answer_relevance_score: Option<u8>,
    /// Answer relevance reasoning, or the judging error.
    pub answer_relevance_reasoning: Option<String>,
    /// Outcome.
    pub status: RecordStatus,
}

/// Evaluation results for a query suite.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Per-query records, in input order.
    pub records: Vec<EvaluationRecord>,
    /// Mean faithfulness over successful records.
    pub average_faithfulness: Option<f64>,
    /// Mean answer relevance over successful records.
    pub average_answer_relevance: Option<f64>,
}

impl EvaluationReport {
    fn from_records(records: Vec<EvaluationRecord>) -> Self {
        let mean = |pick: fn(&EvaluationRecord) -> Option<u8>| -> Option<f64> {
            let scores: Vec<f64> = records
                .iter()
                .filter(|r| r.status == RecordStatus::Success)
                .filter_map(pick)
                .map(f64::from)
                .collect();
            if scores.is_empty() {
                None
            } else {
                #[allow(clippy::cast_precision_loss)]
                let count = scores.len() as f64;
                Some(scores.iter().sum::<f64>() / count)
            }
        };

        let average_faithfulness = mean(|r| r.faithfulness_score);
        let average_answer_relevance = mean(|r| r.answer_relevance_score);
        Self {
            records,
            average_faithfulness,
            average_answer_relevance,
        }
    }

    /// Records with the given status.
    #[must_use]
    pub fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

/// Runs the workflow over a query suite and scores every answer.
pub struct QualityEvaluator {
    orchestrator: Arc<Orchestrator>,
    faithfulness: Judge,
    relevance: Judge,
    step_budget: usize,
}

impl QualityEvaluator {
    /// Creates an evaluator judging with `provider`.
    #[must_use]
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        provider: Arc<dyn LlmProvider>,
        config: &AgentConfig,
        prompts: &PromptSet,
    ) -> Self {
        Self {
            orchestrator,
            faithfulness: Judge {
                criterion: Criterion::Faithfulness,
                provider: Arc::clone(&provider),
                model: config.model.clone(),
                system_prompt: prompts.faithfulness.clone(),
            },
            relevance: Judge {
                criterion: Criterion::Relevance,
                provider,
                model: config.model.clone(),
                system_prompt: prompts.relevance.clone(),
            },
            step_budget: config.step_budget,
        }
    }

    /// Runs and scores one query.
    pub async fn evaluate_query(&self, query: &str) -> EvaluationRecord {
        let run = self.orchestrator.run(query, self.step_budget).await;
        let answer = run.answer().unwrap_or_default().to_string();

        let mut record = EvaluationRecord {
            query: query.to_string(),
            generated_answer: answer.clone(),
            retrieved_contexts_count: run.state.accumulated_evidence().len(),
            unanswerable_sub_queries: run.state.unanswerable_sub_queries().to_vec(),
            faithfulness_score: None,
            faithfulness_reasoning: None,
            answer_relevance_score: None,
            answer_relevance_reasoning: None,
            status: RecordStatus::Failed,
        };

        if answer.is_empty() {
            warn!(query, "no answer generated, skipping judgment");
            return record;
        }

        let context = join_contents(run.state.accumulated_evidence());
        let scores = async {
            let faithful = self
                .faithfulness
                .score(&build_faithfulness_prompt(query, &answer, &context))
                .await?;
            let relevant = self
                .relevance
                .score(&build_relevance_prompt(query, &answer))
                .await?;
            Ok::<_, AgentError>((faithful, relevant))
        }
        .await;

        match scores {
            Ok((faithful, relevant)) => {
                info!(
                    query,
                    faithfulness = faithful.score,
                    relevance = relevant.score,
                    "answer scored"
                );
                record.faithfulness_score = Some(faithful.score);
                record.faithfulness_reasoning = Some(faithful.reasoning);
                record.answer_relevance_score = Some(relevant.score);
                record.answer_relevance_reasoning = Some(relevant.reasoning);
                record.status = RecordStatus::Success;
            }
            Err(e) => {
                warn!(query, error = %e, "judgment failed");
                let reason = format!("Evaluation failed: {e}");
                record.faithfulness_reasoning = Some(reason.clone());
                record.answer_relevance_reasoning = Some(reason);
                record.status = RecordStatus::EvaluationError;
            }
        }

        record
    }

    /// Runs and scores every query in order.
    pub async fn evaluate(&self, queries: &[String]) -> EvaluationReport {
        let mut records = Vec::with_capacity(queries.len());
        for query in queries {
            records.push(self.evaluate_query(query).await);
        }
        EvaluationReport::from_records(records)
    }
}

/// Parses a query suite: one query per line, blank lines and `#` comments
/// ignored.
#[must_use]
pub fn parse_query_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}
