//! Planner - decides the next step of a session
//!
//! `Planner::decide` is a pure function of the session state: no I/O, no
//! clocks, no randomness. Identical states always produce identical actions,
//! which is what makes sessions replayable in tests.
//!
//! Policy, first match wins:
//! 1. too many failed calls: finish with a degraded answer
//! 2. the query has no content terms: ask the user
//! 3. no retrieval for the current query: retrieve
//! 4. retrieval found nothing: ask the user to rephrase
//! 5. a candidate still lacks a summary or entities and the remaining
//!    decisions can cover it: enrich it
//! 6. enough enriched candidates: persist annotations if enabled, synthesize
//!    an answer if a synthesizer is registered, then finish
//! 7. every candidate exhausted: finish with whatever was gathered
//!
//! A call is never repeated once it failed permanently, nor after any failure
//! when its tool is not idempotent.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Value};

use crate::agent::state::{query_terms, AgentState};
use crate::core::config::AgentConfig;
use crate::core::{rank_hits, Entities, Intent, Invocation, SearchHit, ToolKind};
use crate::tools::ToolRegistry;

const PARTIAL_NOTICE: &str = "Only partial information was available.";

/// Next step chosen by the planner
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Call one tool
    Invoke(Invocation),
    /// Call independent tools together; results are merged only after all return
    InvokeAll { calls: Vec<Invocation> },
    /// Suspend until the user answers
    AskUser { prompt: String },
    /// Terminate with an answer
    Finish { answer: String, degraded: bool },
}

/// Tunables of the decision policy
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerPolicy {
    /// Failed calls after which the session gives up
    pub error_ceiling: u32,
    /// Documents to request from the retriever
    pub top_k: usize,
    /// Planner decisions available per run
    pub max_iterations: usize,
    /// Summarize and extract a document in one step
    pub parallel_enrichment: bool,
    /// Write produced summaries and entities back to the store before finishing
    pub persist_annotations: bool,
}

impl Default for PlannerPolicy {
    fn default() -> Self {
        Self {
            error_ceiling: 3,
            top_k: 3,
            max_iterations: 10,
            parallel_enrichment: false,
            persist_annotations: false,
        }
    }
}

impl From<&AgentConfig> for PlannerPolicy {
    fn from(config: &AgentConfig) -> Self {
        Self {
            error_ceiling: config.error_ceiling,
            top_k: config.top_k,
            max_iterations: config.max_iterations,
            parallel_enrichment: config.parallel_enrichment,
            persist_annotations: config.persist_annotations,
        }
    }
}

/// Tool names the planner dispatches to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolNames {
    pub retrieve: Option<String>,
    pub summarize: Option<String>,
    pub extract: Option<String>,
    pub store: Option<String>,
    pub synthesize: Option<String>,
    /// Tools whose calls are never repeated after a failure
    pub non_idempotent: BTreeSet<String>,
}

impl ToolNames {
    /// First registered tool of each kind
    pub fn from_registry(registry: &ToolRegistry) -> Self {
        let name = |kind| registry.first_of_kind(kind).map(|s| s.name.clone());
        Self {
            retrieve: name(ToolKind::Retrieve),
            summarize: name(ToolKind::Summarize),
            extract: name(ToolKind::Extract),
            store: name(ToolKind::Store),
            synthesize: name(ToolKind::Synthesize),
            non_idempotent: registry
                .list()
                .iter()
                .filter(|s| !s.idempotent)
                .map(|s| s.name.clone())
                .collect(),
        }
    }
}

/// Enrichment status of one retrieved document
struct Candidate<'a> {
    hit: &'a SearchHit,
    summary: Option<&'a str>,
    entities: Option<Entities>,
    /// Calls still worth making, in the order they should run
    missing: Vec<Invocation>,
    /// A required artifact can no longer be produced
    exhausted: bool,
}

impl Candidate<'_> {
    fn is_complete(&self) -> bool {
        self.missing.is_empty() && !self.exhausted
    }

    fn is_pending(&self) -> bool {
        !self.missing.is_empty() && !self.exhausted
    }
}

pub struct Planner {
    tools: ToolNames,
    policy: PlannerPolicy,
}

impl Planner {
    pub fn new(tools: ToolNames, policy: PlannerPolicy) -> Self {
        Self { tools, policy }
    }

    /// Planner dispatching to the first tool of each kind in the registry
    pub fn from_registry(registry: &ToolRegistry, policy: PlannerPolicy) -> Self {
        Self::new(ToolNames::from_registry(registry), policy)
    }

    pub fn policy(&self) -> &PlannerPolicy {
        &self.policy
    }

    pub fn tools(&self) -> &ToolNames {
        &self.tools
    }

    /// Choose the next action for a session
    pub fn decide(&self, state: &AgentState) -> Action {
        if state.error_count() >= self.policy.error_ceiling {
            let last = state
                .last_error()
                .map(|e| format!(" The last error was: {}.", e.message))
                .unwrap_or_default();
            return Action::Finish {
                answer: format!(
                    "I'm sorry, I could not complete this request: {} tool calls failed.{}",
                    state.error_count(),
                    last
                ),
                degraded: true,
            };
        }

        if query_terms(state).is_empty() {
            return Action::AskUser {
                prompt: "What topic or event should I look into?".to_string(),
            };
        }

        let goal = state.goal();
        let query = state.effective_query();
        // Decisions still available in this run, the current one included
        let decisions_left = self.policy.max_iterations.saturating_sub(state.steps());

        let Some(ref retriever) = self.tools.retrieve else {
            return Action::Finish {
                answer: "I'm sorry, no retrieval tool is available to find documents.".to_string(),
                degraded: true,
            };
        };

        let retrieval = state.retrieval().filter(|r| r.query == query);
        let Some(retrieval) = retrieval else {
            let input = json!({ "query": query, "k": self.retrieval_k(state) });
            if self.exhausted(state, retriever, &input) {
                let reason = state
                    .last_error()
                    .map(|e| e.message.clone())
                    .unwrap_or_default();
                return Action::Finish {
                    answer: format!("I'm sorry, the document search failed: {}", reason),
                    degraded: true,
                };
            }
            return Action::Invoke(Invocation::new(retriever.clone(), input));
        };

        if retrieval.hits.is_empty() {
            if goal.constraints().require_grounding {
                return Action::AskUser {
                    prompt: format!(
                        "I couldn't find any documents about \"{}\". Could you rephrase or add more detail?",
                        query
                    ),
                };
            }
            return Action::Finish {
                answer: format!("No documents matched \"{}\".", query),
                degraded: false,
            };
        }

        let limit = goal.constraints().result_limit();
        let mut hits = retrieval.hits.clone();
        rank_hits(&mut hits);
        if let Some(max) = limit {
            hits.truncate(max);
        }

        let intent = goal.intent();
        let candidates: Vec<Candidate> = hits.iter().map(|h| self.assess(state, h, intent)).collect();

        let complete: Vec<&Candidate> = candidates.iter().filter(|c| c.is_complete()).collect();
        let pending = candidates.iter().find(|c| c.is_pending());
        let viable = complete.len() + candidates.iter().filter(|c| c.is_pending()).count();
        let target = limit.unwrap_or(1).min(viable);

        if let Some(candidate) = pending.filter(|_| complete.len() < target) {
            let parallel = self.policy.parallel_enrichment && candidate.missing.len() > 1;
            let cost = if parallel { 1 } else { candidate.missing.len() };
            let unstored = complete.iter().filter(|c| !state.is_stored(&c.hit.id)).count() + 1;

            // Without a finished document there is nothing to fall back on
            if complete.is_empty() || cost + self.closing_cost(unstored) <= decisions_left {
                if parallel {
                    return Action::InvokeAll {
                        calls: candidate.missing.clone(),
                    };
                }
                return Action::Invoke(candidate.missing[0].clone());
            }
        }

        if !complete.is_empty() {
            if decisions_left > 1 {
                if let Some(store) = self.annotation_step(state, &complete) {
                    return Action::Invoke(store);
                }
            }
            return self.conclude(state, &query, intent, &complete, false, decisions_left);
        }

        let partial: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.summary.is_some() || c.entities.is_some())
            .collect();
        if partial.is_empty() {
            return Action::Finish {
                answer: format!(
                    "I'm sorry, none of the {} retrieved documents could be processed.",
                    candidates.len()
                ),
                degraded: true,
            };
        }
        self.conclude(state, &query, intent, &partial, true, decisions_left)
    }

    fn retrieval_k(&self, state: &AgentState) -> usize {
        state
            .goal()
            .constraints()
            .result_limit()
            .unwrap_or(0)
            .max(self.policy.top_k)
            .max(1)
    }

    /// Whether a call must not be issued again
    fn exhausted(&self, state: &AgentState, tool: &str, input: &Value) -> bool {
        if self.tools.non_idempotent.contains(tool) {
            state.has_failed(tool, input)
        } else {
            state.failed_permanently(tool, input)
        }
    }

    /// Decisions needed after the last enrichment: annotations, synthesis, finish
    fn closing_cost(&self, unstored: usize) -> usize {
        let annotate = match self.tools.store {
            Some(_) if self.policy.persist_annotations => unstored,
            _ => 0,
        };
        let synthesize = usize::from(self.tools.synthesize.is_some());
        annotate + synthesize + 1
    }

    fn assess<'a>(&self, state: &'a AgentState, hit: &'a SearchHit, intent: Intent) -> Candidate<'a> {
        let summary = state.summary(&hit.id);
        let entities = state.entities(&hit.id);
        let input = json!({ "doc_id": hit.id });

        let mut missing = Vec::new();
        let mut exhausted = false;

        let required = [
            (intent.needs_summary() && summary.is_none(), &self.tools.summarize),
            (intent.needs_entities() && entities.is_none(), &self.tools.extract),
        ];
        for (needed, tool) in required {
            if !needed {
                continue;
            }
            match tool {
                Some(name) if !self.exhausted(state, name, &input) => {
                    missing.push(Invocation::new(name.clone(), input.clone()));
                }
                _ => exhausted = true,
            }
        }

        Candidate {
            hit,
            summary,
            entities,
            missing,
            exhausted,
        }
    }

    /// Store write-back for the first finished document not yet annotated
    fn annotation_step(&self, state: &AgentState, complete: &[&Candidate]) -> Option<Invocation> {
        if !self.policy.persist_annotations {
            return None;
        }
        let store = self.tools.store.as_ref()?;

        complete.iter().find_map(|c| {
            if state.is_stored(&c.hit.id) {
                return None;
            }
            let mut input = json!({ "op": "annotate", "doc_id": c.hit.id });
            if let Some(summary) = c.summary {
                input["summary"] = Value::String(summary.to_string());
            }
            if let Some(ref entities) = c.entities {
                input["entities"] = serde_json::to_value(entities).ok()?;
            }
            if self.exhausted(state, store, &input) {
                return None;
            }
            Some(Invocation::new(store.clone(), input))
        })
    }

    /// Final answer over the gathered documents. A registered synthesizer
    /// writes it once; if that call failed, or no decision is left for it,
    /// the answer is composed from the artifacts directly.
    fn conclude(
        &self,
        state: &AgentState,
        query: &str,
        intent: Intent,
        docs: &[&Candidate],
        partial: bool,
        decisions_left: usize,
    ) -> Action {
        let with_notice = |answer: String| {
            if partial {
                format!("{}\n{}", PARTIAL_NOTICE, answer)
            } else {
                answer
            }
        };

        if let Some(ref synthesizer) = self.tools.synthesize {
            let sources: Vec<&str> = docs.iter().map(|c| c.hit.id.as_str()).collect();
            let written = state
                .synthesis()
                .filter(|s| s.query == query && s.sources == sources);
            if let Some(synthesis) = written {
                return Action::Finish {
                    answer: with_notice(synthesis.answer),
                    degraded: false,
                };
            }

            let input = synthesis_input(query, docs);
            if decisions_left > 1 && !state.has_failed(synthesizer, &input) {
                return Action::Invoke(Invocation::new(synthesizer.clone(), input));
            }
        }

        Action::Finish {
            answer: with_notice(compose_answer(intent, docs)),
            degraded: false,
        }
    }
}

fn synthesis_input(query: &str, docs: &[&Candidate]) -> Value {
    let documents: Vec<Value> = docs
        .iter()
        .map(|c| {
            let mut doc = json!({ "doc_id": c.hit.id });
            if let Some(summary) = c.summary {
                doc["summary"] = Value::String(summary.to_string());
            }
            if let Some(ref entities) = c.entities {
                if let Ok(value) = serde_json::to_value(entities) {
                    doc["entities"] = value;
                }
            }
            doc
        })
        .collect();
    json!({ "query": query, "documents": documents })
}

fn compose_answer(intent: Intent, candidates: &[&Candidate]) -> String {
    if let [only] = candidates {
        if intent == Intent::Summarize {
            if let Some(summary) = only.summary {
                return summary.to_string();
            }
        }
        if intent == Intent::Extract {
            if let Some(ref entities) = only.entities {
                return entities.describe();
            }
        }
    }

    candidates
        .iter()
        .map(|c| {
            let mut block = format!("[{}]", c.hit.id);
            if let Some(summary) = c.summary {
                block.push(' ');
                block.push_str(summary);
            }
            if let Some(ref entities) = c.entities {
                if !entities.is_empty() {
                    block.push_str("\n  ");
                    block.push_str(&entities.describe());
                }
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AdapterError, CallOutcome, Constraints, Goal};
    use chrono::Utc;

    fn names() -> ToolNames {
        ToolNames {
            retrieve: Some("retrieve".into()),
            summarize: Some("summarize".into()),
            extract: Some("extract".into()),
            store: Some("store".into()),
            ..Default::default()
        }
    }

    fn planner() -> Planner {
        Planner::new(names(), PlannerPolicy::default())
    }

    fn succeed(state: &mut AgentState, kind: ToolKind, tool: &str, doc_id: &str, output: Value) {
        state
            .record(
                kind,
                Invocation::new(tool, json!({ "doc_id": doc_id })),
                CallOutcome::Success { output },
                1,
                Utc::now(),
            )
            .unwrap();
    }

    fn enrich(state: &mut AgentState, doc_id: &str) {
        succeed(
            state,
            ToolKind::Summarize,
            "summarize",
            doc_id,
            json!({ "doc_id": doc_id, "summary": format!("Summary of {}.", doc_id) }),
        );
        succeed(
            state,
            ToolKind::Extract,
            "extract",
            doc_id,
            json!({ "doc_id": doc_id, "entities": { "locations": ["Region X"] } }),
        );
    }

    fn limited(query: &str, max_results: usize) -> Goal {
        Goal::with_constraints(
            query,
            Constraints {
                max_results: Some(max_results),
                ..Default::default()
            },
        )
    }

    fn record(state: &mut AgentState, kind: ToolKind, action: Action, outcome: CallOutcome) {
        let invocation = match action {
            Action::Invoke(invocation) => invocation,
            other => panic!("expected an invoke, got {:?}", other),
        };
        state.record(kind, invocation, outcome, 1, Utc::now()).unwrap();
    }

    fn retrieved(goal: Goal, hits: Value) -> AgentState {
        let mut state = AgentState::new(goal);
        let action = planner().decide(&state);
        let query = state.effective_query();
        record(
            &mut state,
            ToolKind::Retrieve,
            action,
            CallOutcome::Success {
                output: json!({ "query": query, "hits": hits }),
            },
        );
        state
    }

    #[test]
    fn test_first_step_is_retrieval() {
        let state = AgentState::new(Goal::new("Summarize the most relevant article about wildfires"));
        assert_eq!(
            planner().decide(&state),
            Action::Invoke(Invocation::new(
                "retrieve",
                json!({ "query": "Summarize the most relevant article about wildfires", "k": 3 })
            ))
        );
    }

    #[test]
    fn test_summarizes_best_candidate() {
        let state = retrieved(
            Goal::new("Summarize the most relevant article about wildfires"),
            json!([{ "id": "doc-7", "score": 0.65 }, { "id": "doc-42", "score": 0.91 }]),
        );
        assert_eq!(
            planner().decide(&state),
            Action::Invoke(Invocation::new("summarize", json!({ "doc_id": "doc-42" })))
        );
    }

    #[test]
    fn test_tie_break_on_lowest_id() {
        let state = retrieved(
            Goal::new("Summarize wildfires"),
            json!([{ "id": "doc-9", "score": 0.5 }, { "id": "doc-10", "score": 0.5 }]),
        );
        assert_eq!(
            planner().decide(&state),
            Action::Invoke(Invocation::new("summarize", json!({ "doc_id": "doc-10" })))
        );
    }

    #[test]
    fn test_empty_retrieval_asks_user() {
        let state = retrieved(Goal::new("Summarize wildfires"), json!([]));
        assert!(matches!(planner().decide(&state), Action::AskUser { .. }));
    }

    #[test]
    fn test_ungrounded_goal_finishes_on_empty_retrieval() {
        let goal = Goal::with_constraints(
            "Summarize wildfires",
            Constraints {
                require_grounding: false,
                ..Default::default()
            },
        );
        let state = retrieved(goal, json!([]));
        assert!(matches!(
            planner().decide(&state),
            Action::Finish { degraded: false, .. }
        ));
    }

    #[test]
    fn test_vague_goal_asks_user() {
        let state = AgentState::new(Goal::new("Tell me about it"));
        assert!(matches!(planner().decide(&state), Action::AskUser { .. }));
    }

    #[test]
    fn test_circuit_breaker() {
        let mut state = retrieved(
            Goal::new("Summarize wildfires"),
            json!([{ "id": "doc-42", "score": 0.9 }]),
        );
        for _ in 0..3 {
            let action = planner().decide(&state);
            record(
                &mut state,
                ToolKind::Summarize,
                action,
                CallOutcome::Failure {
                    error: AdapterError::transient("rate limited"),
                },
            );
        }
        match planner().decide(&state) {
            Action::Finish { answer, degraded } => {
                assert!(degraded);
                assert!(answer.contains("rate limited"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_routes_around_permanent_failure() {
        let mut state = retrieved(
            Goal::new("Summarize wildfires"),
            json!([{ "id": "doc-42", "score": 0.9 }, { "id": "doc-7", "score": 0.6 }]),
        );
        let action = planner().decide(&state);
        record(
            &mut state,
            ToolKind::Summarize,
            action,
            CallOutcome::Failure {
                error: AdapterError::permanent("document 'doc-42' not found"),
            },
        );
        assert_eq!(
            planner().decide(&state),
            Action::Invoke(Invocation::new("summarize", json!({ "doc_id": "doc-7" })))
        );
    }

    #[test]
    fn test_answer_intent_needs_both_artifacts() {
        let mut state = retrieved(
            Goal::new("What happened with the wildfires?"),
            json!([{ "id": "doc-42", "score": 0.9 }]),
        );
        let action = planner().decide(&state);
        record(
            &mut state,
            ToolKind::Summarize,
            action,
            CallOutcome::Success {
                output: json!({ "doc_id": "doc-42", "summary": "Thousands fled." }),
            },
        );
        assert_eq!(
            planner().decide(&state),
            Action::Invoke(Invocation::new("extract", json!({ "doc_id": "doc-42" })))
        );
    }

    #[test]
    fn test_parallel_enrichment() {
        let planner = Planner::new(
            planner().tools,
            PlannerPolicy {
                parallel_enrichment: true,
                ..Default::default()
            },
        );
        let state = retrieved(
            Goal::new("What happened with the wildfires?"),
            json!([{ "id": "doc-42", "score": 0.9 }]),
        );
        match planner.decide(&state) {
            Action::InvokeAll { calls } => {
                let tools: Vec<_> = calls.iter().map(|c| c.tool.as_str()).collect();
                assert_eq!(tools, vec!["summarize", "extract"]);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_decide_is_deterministic() {
        let state = retrieved(
            Goal::new("Summarize wildfires"),
            json!([{ "id": "doc-42", "score": 0.9 }]),
        );
        let copy = state.clone();
        assert_eq!(planner().decide(&state), planner().decide(&copy));
    }

    #[test]
    fn test_non_idempotent_tool_is_not_retried() {
        let mut tools = names();
        tools.non_idempotent.insert("summarize".to_string());
        let planner = Planner::new(tools, PlannerPolicy::default());

        let mut state = retrieved(
            Goal::new("Summarize wildfires"),
            json!([{ "id": "doc-42", "score": 0.9 }, { "id": "doc-7", "score": 0.6 }]),
        );
        let action = planner.decide(&state);
        record(
            &mut state,
            ToolKind::Summarize,
            action,
            CallOutcome::Failure {
                error: AdapterError::transient("connection reset"),
            },
        );

        assert_eq!(
            planner.decide(&state),
            Action::Invoke(Invocation::new("summarize", json!({ "doc_id": "doc-7" })))
        );
    }

    #[test]
    fn test_covers_several_documents() {
        let mut state = retrieved(
            limited("What happened with the wildfires?", 2),
            json!([
                { "id": "doc-42", "score": 0.9 },
                { "id": "doc-7", "score": 0.6 },
                { "id": "doc-3", "score": 0.2 }
            ]),
        );
        enrich(&mut state, "doc-42");
        assert_eq!(
            planner().decide(&state),
            Action::Invoke(Invocation::new("summarize", json!({ "doc_id": "doc-7" })))
        );

        enrich(&mut state, "doc-7");
        match planner().decide(&state) {
            Action::Finish { answer, degraded } => {
                assert!(!degraded);
                assert!(answer.starts_with("[doc-42] Summary of doc-42."));
                assert!(answer.contains("[doc-7] Summary of doc-7."));
                assert!(!answer.contains("doc-3"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_stops_enriching_when_budget_runs_out() {
        let mut state = retrieved(
            limited("What happened with the wildfires?", 2),
            json!([{ "id": "doc-42", "score": 0.9 }, { "id": "doc-7", "score": 0.6 }]),
        );
        enrich(&mut state, "doc-42");
        for _ in 0..8 {
            state.count_step();
        }

        // doc-7 needs two calls and the finish a third; two decisions remain
        match planner().decide(&state) {
            Action::Finish { answer, degraded } => {
                assert!(!degraded);
                assert!(answer.contains("[doc-42]"));
                assert!(!answer.contains("doc-7"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_zero_max_results_still_enriches() {
        let state = retrieved(
            limited("Summarize wildfires", 0),
            json!([{ "id": "doc-42", "score": 0.9 }, { "id": "doc-7", "score": 0.6 }]),
        );
        assert_eq!(
            planner().decide(&state),
            Action::Invoke(Invocation::new("summarize", json!({ "doc_id": "doc-42" })))
        );
    }

    #[test]
    fn test_partial_answer_when_candidates_exhausted() {
        let mut state = retrieved(
            Goal::new("What happened with the wildfires?"),
            json!([{ "id": "doc-42", "score": 0.9 }]),
        );
        succeed(
            &mut state,
            ToolKind::Summarize,
            "summarize",
            "doc-42",
            json!({ "doc_id": "doc-42", "summary": "Thousands fled." }),
        );
        let action = planner().decide(&state);
        record(
            &mut state,
            ToolKind::Extract,
            action,
            CallOutcome::Failure {
                error: AdapterError::permanent("model returned no JSON object"),
            },
        );

        assert_eq!(
            planner().decide(&state),
            Action::Finish {
                answer: "Only partial information was available.\n[doc-42] Thousands fled.".to_string(),
                degraded: false,
            }
        );
    }

    #[test]
    fn test_failed_search_finishes_degraded() {
        let mut state = AgentState::new(Goal::new("Summarize wildfires"));
        let action = planner().decide(&state);
        record(
            &mut state,
            ToolKind::Retrieve,
            action,
            CallOutcome::Failure {
                error: AdapterError::permanent("query has 3 dimensions, index has 4"),
            },
        );

        match planner().decide(&state) {
            Action::Finish { answer, degraded } => {
                assert!(degraded);
                assert!(answer.contains("document search failed"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_vague_clarification_asks_again() {
        let mut state = AgentState::new(Goal::new("Tell me about it"));
        match planner().decide(&state) {
            Action::AskUser { prompt } => state.await_input(prompt).unwrap(),
            other => panic!("unexpected action {:?}", other),
        }
        state.resume("it").unwrap();
        assert!(matches!(planner().decide(&state), Action::AskUser { .. }));
    }

    #[test]
    fn test_synthesizer_writes_the_answer() {
        let mut tools = names();
        tools.synthesize = Some("synthesize".to_string());
        let planner = Planner::new(tools, PlannerPolicy::default());

        let mut state = retrieved(
            Goal::new("What happened with the wildfires?"),
            json!([{ "id": "doc-42", "score": 0.9 }]),
        );
        enrich(&mut state, "doc-42");

        let invocation = match planner.decide(&state) {
            Action::Invoke(invocation) => invocation,
            other => panic!("unexpected action {:?}", other),
        };
        assert_eq!(invocation.tool, "synthesize");
        assert_eq!(invocation.input["documents"][0]["doc_id"], "doc-42");
        assert_eq!(invocation.input["documents"][0]["summary"], "Summary of doc-42.");

        state
            .record(
                ToolKind::Synthesize,
                invocation,
                CallOutcome::Success {
                    output: json!({ "answer": "Thousands fled the fires [doc-42]." }),
                },
                1,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(
            planner.decide(&state),
            Action::Finish {
                answer: "Thousands fled the fires [doc-42].".to_string(),
                degraded: false,
            }
        );
    }

    #[test]
    fn test_failed_synthesis_falls_back_to_composition() {
        let mut tools = names();
        tools.synthesize = Some("synthesize".to_string());
        let planner = Planner::new(tools, PlannerPolicy::default());

        let mut state = retrieved(
            Goal::new("Summarize wildfires"),
            json!([{ "id": "doc-42", "score": 0.9 }]),
        );
        succeed(
            &mut state,
            ToolKind::Summarize,
            "summarize",
            "doc-42",
            json!({ "doc_id": "doc-42", "summary": "Thousands fled." }),
        );
        let action = planner.decide(&state);
        record(
            &mut state,
            ToolKind::Synthesize,
            action,
            CallOutcome::Failure {
                error: AdapterError::transient("model overloaded"),
            },
        );

        assert_eq!(
            planner.decide(&state),
            Action::Finish {
                answer: "Thousands fled.".to_string(),
                degraded: false,
            }
        );
    }
}
