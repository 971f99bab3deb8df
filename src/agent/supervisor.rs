//! Control-token dispatch.
//!
//! The supervisor reads the control token a component left in the state
//! and names the component that runs next. It never touches any other
//! field.

use std::fmt;

use super::state::{Control, WorkflowState};

/// Workflow components the supervisor routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    /// Query decomposition and cursor advance.
    Decomposer,
    /// Evidence retrieval.
    Retriever,
    /// Sufficiency evaluation.
    Evaluator,
    /// Draft synthesis.
    Synthesizer,
    /// Report formatting.
    Formatter,
}

impl ComponentId {
    /// Component name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decomposer => "decomposer",
            Self::Retriever => "retriever",
            Self::Evaluator => "evaluator",
            Self::Synthesizer => "synthesizer",
            Self::Formatter => "formatter",
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a run goes after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Run this component next.
    Component(ComponentId),
    /// Stop the run.
    Terminate,
}

/// Maps a control token to the next route.
#[must_use]
pub const fn route(control: Control) -> Route {
    match control {
        Control::Decompose => Route::Component(ComponentId::Decomposer),
        Control::Retrieve => Route::Component(ComponentId::Retriever),
        Control::Evaluate => Route::Component(ComponentId::Evaluator),
        Control::Synthesize => Route::Component(ComponentId::Synthesizer),
        Control::Format => Route::Component(ComponentId::Formatter),
        Control::Done | Control::Fatal => Route::Terminate,
    }
}

/// Routes a state by its control token.
#[must_use]
pub const fn dispatch(state: &WorkflowState) -> Route {
    route(state.control())
}
