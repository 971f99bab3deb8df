//! Property tests over randomized workflow runs.

mod common;

use std::sync::Arc;

use proptest::prelude::*;

use rag_agent::agent::{AgentConfig, Control, Orchestrator, PromptSet, WorkflowState};

use common::{Retrieval, ScriptedProvider, ScriptedRetriever};

#[derive(Debug, Clone)]
struct Scenario {
    sub_queries: usize,
    retrieval: u8,
    verdict: Option<&'static str>,
    max_attempts: u32,
    step_budget: usize,
}

fn scenario() -> impl Strategy<Value = Scenario> {
    (
        1usize..5,
        0u8..3,
        prop_oneof![
            Just(None),
            Just(Some("SUFFICIENCY: YES\nFEEDBACK: ok")),
            Just(Some("SUFFICIENCY: NO\nFEEDBACK: thin")),
            Just(Some("gibberish")),
        ],
        1u32..5,
        0usize..80,
    )
        .prop_map(
            |(sub_queries, retrieval, verdict, max_attempts, step_budget)| Scenario {
                sub_queries,
                retrieval,
                verdict,
                max_attempts,
                step_budget,
            },
        )
}

/// Every state the run passed through, in order.
fn observe(s: &Scenario) -> (Vec<WorkflowState>, usize) {
    let plan: Vec<String> = (0..s.sub_queries).map(|i| format!("part {i}")).collect();
    let mut provider = ScriptedProvider::offline()
        .decomposer(&serde_json::to_string(&plan).unwrap_or_default())
        .synthesizer("draft")
        .formatter("report");
    if let Some(verdict) = s.verdict {
        provider = provider.evaluator(verdict);
    }
    let retrieval = match s.retrieval {
        0 => Retrieval::Empty,
        1 => Retrieval::Chunks(vec!["one", "two"]),
        _ => Retrieval::Failing,
    };

    let config = AgentConfig::builder()
        .api_key("test")
        .max_retrieval_attempts(s.max_attempts)
        .build()
        .unwrap_or_else(|_| unreachable!());
    let orchestrator = Orchestrator::with_prompts(
        Arc::new(provider),
        Arc::new(ScriptedRetriever::new(retrieval)),
        &config,
        PromptSet::defaults(),
    );

    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|_| unreachable!());
    let mut states = Vec::new();
    let run = rt.block_on(orchestrator.run_inspect("question", s.step_budget, |state| {
        states.push(state.clone());
    }));
    (states, run.steps)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cursor_is_monotonic_and_bounded(s in scenario()) {
        let (states, _) = observe(&s);
        for pair in states.windows(2) {
            prop_assert!(pair[1].sub_query_index() >= pair[0].sub_query_index());
        }
        for state in &states {
            prop_assert!(state.sub_query_index() <= state.sub_queries().len());
        }
    }

    #[test]
    fn collections_are_append_only(s in scenario()) {
        let (states, _) = observe(&s);
        for pair in states.windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            prop_assert!(after.accumulated_evidence().len() >= before.accumulated_evidence().len());
            for (a, b) in before.accumulated_evidence().iter().zip(after.accumulated_evidence()) {
                prop_assert_eq!(&a.content, &b.content);
            }
            prop_assert!(after
                .unanswerable_sub_queries()
                .starts_with(before.unanswerable_sub_queries()));
        }
    }

    #[test]
    fn attempts_never_exceed_limit_at_advance(s in scenario()) {
        let (states, _) = observe(&s);
        for pair in states.windows(2) {
            if pair[1].sub_query_index() > pair[0].sub_query_index() {
                prop_assert!(pair[0].retrieval_attempts() <= s.max_attempts);
                prop_assert!(pair[1].retrieval_attempts() <= s.max_attempts);
            }
        }
    }

    #[test]
    fn every_run_terminates_within_budget(s in scenario()) {
        let (states, steps) = observe(&s);
        prop_assert!(steps <= s.step_budget);
        let last = states.last().map(WorkflowState::control);
        prop_assert!(matches!(last, Some(Control::Done | Control::Fatal)));
    }
}
