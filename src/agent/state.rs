//! Workflow state threaded through every step of a run.
//!
//! A [`WorkflowState`] is created per query and moved through each
//! component. Components consume the previous state and return the next
//! one through the transition methods below, which keep the cursor and
//! the accumulated collections consistent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// A piece of retrieved evidence with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    /// Chunk text.
    pub content: String,
    /// Source document the chunk was cut from.
    pub source: String,
    /// Position of the chunk within its source.
    pub position: usize,
    /// Store rank score, when the store reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl EvidenceChunk {
    /// Creates a chunk with no provenance.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: String::new(),
            position: 0,
            score: None,
        }
    }

    /// Sets the source and position.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>, position: usize) -> Self {
        self.source = source.into();
        self.position = position;
        self
    }

    /// Sets the rank score.
    #[must_use]
    pub const fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// Joins chunk contents with blank lines.
#[must_use]
pub fn join_contents(chunks: &[EvidenceChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The next step a run should execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Control {
    /// Plan sub-queries, or move the cursor to the next one.
    Decompose,
    /// Fetch evidence for the current sub-query.
    Retrieve,
    /// Judge the retrieved evidence.
    Evaluate,
    /// Draft an answer from accumulated evidence.
    Synthesize,
    /// Polish the draft into the final report.
    Format,
    /// The run completed.
    Done,
    /// The run was aborted.
    Fatal,
}

impl Control {
    /// Every control value, in workflow order.
    pub const ALL: [Self; 7] = [
        Self::Decompose,
        Self::Retrieve,
        Self::Evaluate,
        Self::Synthesize,
        Self::Format,
        Self::Done,
        Self::Fatal,
    ];

    /// Returns the wire tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decompose => "DECOMPOSE",
            Self::Retrieve => "RETRIEVE",
            Self::Evaluate => "EVALUATE",
            Self::Synthesize => "SYNTHESIZE",
            Self::Format => "FORMAT",
            Self::Done => "DONE",
            Self::Fatal => "FATAL",
        }
    }

    /// Whether the run stops at this control value.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Fatal)
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Control {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AgentError::UnknownControl { tag: s.to_string() })
    }
}

/// State of one workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowState {
    original_query: String,
    sub_queries: Vec<String>,
    sub_query_index: usize,
    current_sub_query: String,
    retrieved_chunks: Vec<EvidenceChunk>,
    sufficiency: bool,
    feedback: String,
    retrieval_attempts: u32,
    accumulated_evidence: Vec<EvidenceChunk>,
    unanswerable_sub_queries: Vec<String>,
    draft_answer: String,
    final_report: String,
    control: Control,
}

impl WorkflowState {
    /// Creates the initial state for a query.
    #[must_use]
    pub fn new(original_query: impl Into<String>) -> Self {
        Self {
            original_query: original_query.into(),
            sub_queries: Vec::new(),
            sub_query_index: 0,
            current_sub_query: String::new(),
            retrieved_chunks: Vec::new(),
            sufficiency: false,
            feedback: String::new(),
            retrieval_attempts: 0,
            accumulated_evidence: Vec::new(),
            unanswerable_sub_queries: Vec::new(),
            draft_answer: String::new(),
            final_report: String::new(),
            control: Control::Decompose,
        }
    }

    /// The user's query.
    #[must_use]
    pub fn original_query(&self) -> &str {
        &self.original_query
    }

    /// Planned sub-queries, in processing order.
    #[must_use]
    pub fn sub_queries(&self) -> &[String] {
        &self.sub_queries
    }

    /// Cursor into [`Self::sub_queries`].
    #[must_use]
    pub const fn sub_query_index(&self) -> usize {
        self.sub_query_index
    }

    /// The sub-query currently being resolved.
    #[must_use]
    pub fn current_sub_query(&self) -> &str {
        &self.current_sub_query
    }

    /// Chunks from the most recent retrieval.
    #[must_use]
    pub fn retrieved_chunks(&self) -> &[EvidenceChunk] {
        &self.retrieved_chunks
    }

    /// Latest sufficiency verdict for the current sub-query.
    #[must_use]
    pub const fn sufficiency(&self) -> bool {
        self.sufficiency
    }

    /// Reason given alongside an insufficient verdict.
    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// Retrievals made for the current sub-query.
    #[must_use]
    pub const fn retrieval_attempts(&self) -> u32 {
        self.retrieval_attempts
    }

    /// Evidence accepted so far, in acceptance order.
    #[must_use]
    pub fn accumulated_evidence(&self) -> &[EvidenceChunk] {
        &self.accumulated_evidence
    }

    /// Sub-queries that could not be answered.
    #[must_use]
    pub fn unanswerable_sub_queries(&self) -> &[String] {
        &self.unanswerable_sub_queries
    }

    /// Synthesizer output awaiting formatting.
    #[must_use]
    pub fn draft_answer(&self) -> &str {
        &self.draft_answer
    }

    /// Formatter output. Empty until the run completes.
    #[must_use]
    pub fn final_report(&self) -> &str {
        &self.final_report
    }

    /// Next step to execute.
    #[must_use]
    pub const fn control(&self) -> Control {
        self.control
    }

    /// Whether the sub-query plan has been populated.
    #[must_use]
    pub fn is_planned(&self) -> bool {
        !self.sub_queries.is_empty()
    }

    /// Whether the cursor has moved past the last sub-query.
    #[must_use]
    pub fn is_plan_exhausted(&self) -> bool {
        self.sub_query_index >= self.sub_queries.len()
    }

    /// Installs the sub-query plan and resets the per-run collections.
    ///
    /// The plan is installed once per run: calling this on a planned state
    /// leaves it unchanged. An empty plan is replaced by the original query.
    #[must_use]
    pub fn begin_plan(mut self, sub_queries: Vec<String>) -> Self {
        if self.is_planned() {
            return self;
        }
        self.sub_queries = if sub_queries.is_empty() {
            vec![self.original_query.clone()]
        } else {
            sub_queries
        };
        self.sub_query_index = 0;
        self.retrieval_attempts = 0;
        self.accumulated_evidence.clear();
        self.unanswerable_sub_queries.clear();
        self
    }

    /// Points the run at the sub-query under the cursor.
    ///
    /// Clears the per-sub-query fields and routes to retrieval, or to
    /// synthesis once every sub-query has been resolved.
    #[must_use]
    pub fn focus(mut self) -> Self {
        if let Some(next) = self.sub_queries.get(self.sub_query_index) {
            self.current_sub_query = next.clone();
            self.retrieval_attempts = 0;
            self.retrieved_chunks.clear();
            self.sufficiency = false;
            self.feedback.clear();
            self.control = Control::Retrieve;
        } else {
            self.control = Control::Synthesize;
        }
        self
    }

    /// Records a successful retrieval and routes to evaluation.
    #[must_use]
    pub fn record_retrieval(mut self, chunks: Vec<EvidenceChunk>) -> Self {
        self.retrieval_attempts += 1;
        self.retrieved_chunks = chunks;
        self.control = Control::Evaluate;
        self
    }

    /// Records a failed retrieval. The current sub-query is given up on
    /// immediately.
    #[must_use]
    pub fn record_retrieval_failure(mut self) -> Self {
        self.retrieval_attempts += 1;
        self.retrieved_chunks.clear();
        self.mark_unanswerable()
    }

    /// Records the evaluator's verdict without routing.
    #[must_use]
    pub fn record_verdict(mut self, sufficient: bool, feedback: impl Into<String>) -> Self {
        self.sufficiency = sufficient;
        self.feedback = feedback.into();
        self
    }

    /// Appends the retrieved chunks to the accumulated evidence and moves
    /// to the next sub-query.
    #[must_use]
    pub fn accept_evidence(mut self) -> Self {
        self.accumulated_evidence
            .extend(self.retrieved_chunks.iter().cloned());
        self.advance()
    }

    /// Routes back to retrieval for another attempt on the same sub-query.
    #[must_use]
    pub fn request_retry(mut self) -> Self {
        self.control = Control::Retrieve;
        self
    }

    /// Records the current sub-query as unanswerable and moves to the next.
    #[must_use]
    pub fn mark_unanswerable(mut self) -> Self {
        self.unanswerable_sub_queries
            .push(self.current_sub_query.clone());
        self.advance()
    }

    /// Stores the synthesizer's draft and routes to formatting.
    #[must_use]
    pub fn set_draft(mut self, draft: impl Into<String>) -> Self {
        self.draft_answer = draft.into();
        self.control = Control::Format;
        self
    }

    /// Takes the draft out of the state for formatting.
    pub fn take_draft(&mut self) -> String {
        std::mem::take(&mut self.draft_answer)
    }

    /// Stores the final report and completes the run.
    #[must_use]
    pub fn finish(mut self, report: impl Into<String>) -> Self {
        self.draft_answer.clear();
        self.final_report = report.into();
        self.control = Control::Done;
        self
    }

    /// Aborts the run.
    #[must_use]
    pub fn abort(mut self) -> Self {
        self.control = Control::Fatal;
        self
    }

    /// One-line description of how far the run got.
    #[must_use]
    pub fn summary(&self) -> String {
        let unanswerable = if self.unanswerable_sub_queries.is_empty() {
            "none".to_string()
        } else {
            self.unanswerable_sub_queries.join(", ")
        };
        format!(
            "resolved {resolved} of {total} sub-queries, {evidence} evidence chunks accumulated, unanswerable: {unanswerable}",
            resolved = self.sub_query_index.min(self.sub_queries.len()),
            total = self.sub_queries.len(),
            evidence = self.accumulated_evidence.len(),
        )
    }

    fn advance(mut self) -> Self {
        self.sub_query_index = (self.sub_query_index + 1).min(self.sub_queries.len());
        self.control = Control::Decompose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planned(subs: &[&str]) -> WorkflowState {
        WorkflowState::new("original")
            .begin_plan(subs.iter().map(ToString::to_string).collect())
            .focus()
    }

    #[test]
    fn test_new_state_starts_at_decompose() {
        let state = WorkflowState::new("q");
        assert_eq!(state.control(), Control::Decompose);
        assert!(!state.is_planned());
        assert!(state.final_report().is_empty());
    }

    #[test]
    fn test_control_tags_round_trip() {
        for control in Control::ALL {
            assert_eq!(control.as_str().parse::<Control>().ok(), Some(control));
        }
    }

    #[test]
    fn test_unknown_control_tag_rejected() {
        let result = "RESEARCH".parse::<Control>();
        assert!(matches!(result, Err(AgentError::UnknownControl { ref tag }) if tag == "RESEARCH"));
    }

    #[test]
    fn test_lowercase_control_tag_rejected() {
        assert!("decompose".parse::<Control>().is_err());
    }

    #[test]
    fn test_empty_plan_falls_back_to_original() {
        let state = WorkflowState::new("only question").begin_plan(Vec::new());
        assert_eq!(state.sub_queries(), ["only question".to_string()]);
    }

    #[test]
    fn test_plan_installed_once() {
        let state = planned(&["a", "b"]).begin_plan(vec!["c".to_string()]);
        assert_eq!(state.sub_queries().len(), 2);
    }

    #[test]
    fn test_focus_routes_to_retrieve_then_synthesize() {
        let state = planned(&["a"]);
        assert_eq!(state.control(), Control::Retrieve);
        assert_eq!(state.current_sub_query(), "a");

        let state = state
            .record_retrieval(vec![EvidenceChunk::new("x")])
            .accept_evidence()
            .focus();
        assert_eq!(state.control(), Control::Synthesize);
        assert!(state.is_plan_exhausted());
    }

    #[test]
    fn test_retrieval_counts_attempts() {
        let state = planned(&["a"]).record_retrieval(Vec::new());
        assert_eq!(state.retrieval_attempts(), 1);
        assert_eq!(state.control(), Control::Evaluate);

        let state = state.request_retry().record_retrieval(Vec::new());
        assert_eq!(state.retrieval_attempts(), 2);
    }

    #[test]
    fn test_attempts_reset_on_advance() {
        let state = planned(&["a", "b"])
            .record_retrieval(Vec::new())
            .mark_unanswerable()
            .focus();
        assert_eq!(state.retrieval_attempts(), 0);
        assert_eq!(state.current_sub_query(), "b");
        assert_eq!(state.unanswerable_sub_queries(), ["a".to_string()]);
    }

    #[test]
    fn test_retrieval_failure_marks_unanswerable() {
        let state = planned(&["a", "b"]).record_retrieval_failure();
        assert_eq!(state.sub_query_index(), 1);
        assert_eq!(state.control(), Control::Decompose);
        assert_eq!(state.unanswerable_sub_queries(), ["a".to_string()]);
    }

    #[test]
    fn test_accept_evidence_appends_in_order() {
        let state = planned(&["a", "b"])
            .record_retrieval(vec![EvidenceChunk::new("1"), EvidenceChunk::new("2")])
            .accept_evidence()
            .focus()
            .record_retrieval(vec![EvidenceChunk::new("3")])
            .accept_evidence();
        let contents: Vec<_> = state
            .accumulated_evidence()
            .iter()
            .map(|c| c.content.as_str())
            .collect();
        assert_eq!(contents, ["1", "2", "3"]);
    }

    #[test]
    fn test_cursor_never_passes_plan_length() {
        let state = planned(&["a"]).mark_unanswerable().mark_unanswerable();
        assert_eq!(state.sub_query_index(), 1);
    }

    #[test]
    fn test_draft_then_finish() {
        let mut state = WorkflowState::new("q").set_draft("draft");
        assert_eq!(state.control(), Control::Format);
        let draft = state.take_draft();
        assert_eq!(draft, "draft");
        let state = state.finish("report");
        assert_eq!(state.final_report(), "report");
        assert!(state.draft_answer().is_empty());
        assert_eq!(state.control(), Control::Done);
    }

    #[test]
    fn test_summary_mentions_unanswerable() {
        let state = planned(&["a", "b"]).mark_unanswerable();
        let summary = state.summary();
        assert!(summary.contains("resolved 1 of 2"));
        assert!(summary.contains("unanswerable: a"));
    }

    #[test]
    fn test_join_contents() {
        let joined = join_contents(&[EvidenceChunk::new("a"), EvidenceChunk::new("b")]);
        assert_eq!(joined, "a\n\nb");
    }
}
