//! Orchestrator for the decompose/retrieve/evaluate workflow.
//!
//! Owns the five workflow components and drives the supervisor loop: each
//! step dispatches on the state's control token, runs one component, and
//! feeds the returned state back in until the run terminates or the step
//! budget runs out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::decomposer::Decomposer;
use super::evaluator::SufficiencyEvaluator;
use super::formatter::Formatter;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::retriever::{KnowledgeRetriever, RetrievalController};
use super::state::WorkflowState;
use super::supervisor::{ComponentId, Route, dispatch};
use super::synthesizer::Synthesizer;
use crate::error::AgentError;

/// Failure reported when a run completes without a report.
pub const NO_ANSWER_MESSAGE: &str = "An error occurred and no final answer could be generated.";

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run produced a report.
    Completed {
        /// Formatted answer.
        final_report: String,
    },
    /// The run was aborted or produced nothing.
    Failed {
        /// Human-readable reason, including the partial state on abort.
        error: String,
    },
}

/// Result of one workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Terminal state.
    pub state: WorkflowState,
    /// Component steps dispatched.
    pub steps: usize,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

impl WorkflowRun {
    /// Returns the report of a completed run.
    #[must_use]
    pub fn answer(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Completed { final_report } => Some(final_report),
            RunOutcome::Failed { .. } => None,
        }
    }

    /// Whether the run produced a report.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { .. })
    }
}

/// Orchestrates the agentic query workflow.
pub struct Orchestrator {
    decomposer: Decomposer,
    retriever: RetrievalController,
    evaluator: SufficiencyEvaluator,
    synthesizer: Synthesizer,
    formatter: Formatter,
    step_budget: usize,
}

impl Orchestrator {
    /// Creates a new orchestrator with the given collaborators and configuration.
    ///
    /// Loads prompt templates from the directory specified in
    /// [`AgentConfig::prompt_dir`], falling back to compiled-in defaults.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        retriever: Arc<dyn KnowledgeRetriever>,
        config: &AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, retriever, config, prompts)
    }

    /// Creates an orchestrator with an explicit prompt set.
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        retriever: Arc<dyn KnowledgeRetriever>,
        config: &AgentConfig,
        prompts: PromptSet,
    ) -> Self {
        Self {
            decomposer: Decomposer::new(Arc::clone(&provider), config, prompts.decomposer),
            retriever: RetrievalController::new(retriever, config.retrieval_top_k),
            evaluator: SufficiencyEvaluator::new(Arc::clone(&provider), config, prompts.evaluator),
            synthesizer: Synthesizer::new(Arc::clone(&provider), config, prompts.synthesizer),
            formatter: Formatter::new(provider, config, prompts.formatter),
            step_budget: config.step_budget,
        }
    }

    /// Step budget from configuration.
    #[must_use]
    pub const fn default_step_budget(&self) -> usize {
        self.step_budget
    }

    /// Answers `query`, dispatching at most `step_budget` component steps.
    ///
    /// Component failures degrade within the run and never surface here.
    /// The outcome is [`RunOutcome::Failed`] only when the budget runs out
    /// or the run finishes without a report.
    pub async fn run(&self, query: &str, step_budget: usize) -> WorkflowRun {
        self.run_inspect(query, step_budget, |_| {}).await
    }

    /// Like [`Self::run`], calling `observe` with every state the run
    /// passes through, starting with the initial one.
    pub async fn run_inspect<F>(&self, query: &str, step_budget: usize, mut observe: F) -> WorkflowRun
    where
        F: FnMut(&WorkflowState) + Send,
    {
        let start = Instant::now();
        let mut state = WorkflowState::new(query);
        let mut steps = 0usize;
        observe(&state);

        info!(query_len = query.len(), step_budget, "workflow started");

        let budget_error = loop {
            let component = match dispatch(&state) {
                Route::Terminate => break None,
                Route::Component(id) => id,
            };

            if steps >= step_budget {
                let error = AgentError::StepBudgetExceeded {
                    budget: step_budget,
                    summary: state.summary(),
                };
                warn!(steps, %error, "aborting run");
                state = state.abort();
                observe(&state);
                break Some(error);
            }

            steps += 1;
            debug!(step = steps, %component, control = %state.control(), "dispatch");
            state = self.step(component, state).await;
            observe(&state);
        };

        let outcome = match budget_error {
            Some(error) => RunOutcome::Failed {
                error: error.to_string(),
            },
            None if state.final_report().is_empty() => RunOutcome::Failed {
                error: NO_ANSWER_MESSAGE.to_string(),
            },
            None => RunOutcome::Completed {
                final_report: state.final_report().to_string(),
            },
        };

        let elapsed = start.elapsed();
        info!(
            steps,
            completed = matches!(outcome, RunOutcome::Completed { .. }),
            evidence = state.accumulated_evidence().len(),
            unanswerable = state.unanswerable_sub_queries().len(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "workflow finished"
        );

        WorkflowRun {
            outcome,
            state,
            steps,
            elapsed,
        }
    }

    async fn step(&self, component: ComponentId, state: WorkflowState) -> WorkflowState {
        match component {
            ComponentId::Decomposer => self.decomposer.run(state).await,
            ComponentId::Retriever => self.retriever.run(state).await,
            ComponentId::Evaluator => self.evaluator.run(state).await,
            ComponentId::Synthesizer => self.synthesizer.run(state).await,
            ComponentId::Formatter => self.formatter.run(state).await,
        }
    }
}
