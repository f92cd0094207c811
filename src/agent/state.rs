//! Agent session state
//!
//! Tracks the goal, the append-only tool call history, the scratch working
//! memory and the session status. Every mutation goes through a method that
//! enforces the status machine, so a finished session can never grow.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::text;
use crate::core::{
    AdapterError, CallOutcome, Entities, Goal, Invocation, NewsroomError, Result, SearchHit,
    ToolCall, ToolKind,
};

const RETRIEVAL_KEY: &str = "retrieval";
const CLARIFICATIONS_KEY: &str = "clarifications";
const SYNTHESIS_KEY: &str = "synthesis";

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Running,
    AwaitingInput,
    Succeeded,
    Failed,
}

impl Status {
    /// Succeeded and Failed are final
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Succeeded | Status::Failed)
    }

    fn can_become(self, next: Status) -> bool {
        match self {
            Status::Running => next != Status::Running,
            Status::AwaitingInput => next == Status::Running,
            Status::Succeeded | Status::Failed => false,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Running => write!(f, "running"),
            Status::AwaitingInput => write!(f, "awaiting-input"),
            Status::Succeeded => write!(f, "succeeded"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

/// Retrieval results as stored in scratch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrieval {
    pub query: String,
    pub hits: Vec<SearchHit>,
}

/// Model-written answer as stored in scratch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub query: String,
    /// Documents the answer was written from, in the order given
    pub sources: Vec<String>,
    pub answer: String,
}

/// Working state of one agent session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    id: Uuid,
    goal: Goal,
    history: Vec<ToolCall>,
    scratch: BTreeMap<String, Value>,
    status: Status,
    error_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    answer: Option<String>,
    #[serde(default)]
    degraded: bool,
    /// Planner decisions taken since the session last started running
    #[serde(default)]
    steps: usize,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AgentState {
    /// Fresh running session for a goal
    pub fn new(goal: Goal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            goal,
            history: Vec::new(),
            scratch: BTreeMap::new(),
            status: Status::Running,
            error_count: 0,
            prompt: None,
            answer: None,
            degraded: false,
            steps: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    pub fn history(&self) -> &[ToolCall] {
        &self.history
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Question for the user while awaiting input
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Final answer, or the failure reason once failed
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Planner decisions taken in the current run
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Reset the decision count at the start of a run
    pub(crate) fn begin_run(&mut self) {
        self.steps = 0;
    }

    /// Count one planner decision
    pub(crate) fn count_step(&mut self) {
        self.steps += 1;
    }

    /// Attempt number the next call with this tool and input would get
    pub fn next_attempt(&self, invocation: &Invocation) -> u32 {
        let prior = self
            .history
            .iter()
            .filter(|c| c.tool == invocation.tool && c.input == invocation.input)
            .count();
        prior as u32 + 1
    }

    /// Append a finished call and fold its result into scratch.
    ///
    /// The scratch update is computed before anything is written, so it is
    /// applied entirely or not at all. A successful call whose output cannot be
    /// interpreted is recorded as a permanent failure instead.
    pub fn record(
        &mut self,
        kind: ToolKind,
        invocation: Invocation,
        outcome: CallOutcome,
        latency_ms: u64,
        started_at: DateTime<Utc>,
    ) -> Result<&ToolCall> {
        if self.status != Status::Running {
            return Err(NewsroomError::session(format!(
                "cannot record a tool call in a {} session",
                self.status
            )));
        }

        let (outcome, updates) = match outcome {
            CallOutcome::Success { output } => match scratch_updates(kind, &invocation, &output) {
                Ok(updates) => (CallOutcome::Success { output }, updates),
                Err(error) => (CallOutcome::Failure { error }, Vec::new()),
            },
            failure => (failure, Vec::new()),
        };

        if matches!(outcome, CallOutcome::Failure { .. }) {
            self.error_count += 1;
        }

        let call = ToolCall {
            sequence: self.history.len(),
            attempt: self.next_attempt(&invocation),
            tool: invocation.tool,
            input: invocation.input,
            outcome,
            latency_ms,
            started_at,
        };

        self.scratch.extend(updates);
        self.history.push(call);
        self.touch();

        let last = self.history.len() - 1;
        Ok(&self.history[last])
    }

    /// Suspend the session with a question for the user
    pub fn await_input(&mut self, prompt: impl Into<String>) -> Result<()> {
        self.transition(Status::AwaitingInput)?;
        self.prompt = Some(prompt.into());
        Ok(())
    }

    /// Mark the session succeeded with its answer
    pub fn finish(&mut self, answer: impl Into<String>, degraded: bool) -> Result<()> {
        self.transition(Status::Succeeded)?;
        self.answer = Some(answer.into());
        self.degraded = degraded;
        Ok(())
    }

    /// Mark the session failed, keeping the history for diagnosis
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(Status::Failed)?;
        self.answer = Some(reason.into());
        Ok(())
    }

    /// Re-enter a suspended session with the user's clarification
    pub fn resume(&mut self, clarification: &str) -> Result<()> {
        let clarification = clarification.trim();
        if clarification.is_empty() {
            return Err(NewsroomError::AmbiguousInput(
                "the clarification is empty".to_string(),
            ));
        }
        if self.status != Status::AwaitingInput {
            return Err(NewsroomError::session(format!(
                "only a session awaiting input can be resumed (status: {})",
                self.status
            )));
        }

        let mut clarifications = self
            .scratch
            .get(CLARIFICATIONS_KEY)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        clarifications.push(Value::String(clarification.to_string()));
        self.scratch
            .insert(CLARIFICATIONS_KEY.to_string(), Value::Array(clarifications));

        self.transition(Status::Running)?;
        self.prompt = None;
        Ok(())
    }

    /// Clarifications supplied so far, oldest first
    pub fn clarifications(&self) -> Vec<&str> {
        self.scratch
            .get(CLARIFICATIONS_KEY)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// The goal query extended with every clarification
    pub fn effective_query(&self) -> String {
        let mut query = self.goal.query().trim().to_string();
        for clarification in self.clarifications() {
            if !query.is_empty() {
                query.push(' ');
            }
            query.push_str(clarification);
        }
        query
    }

    /// Latest successful retrieval
    pub fn retrieval(&self) -> Option<Retrieval> {
        self.scratch
            .get(RETRIEVAL_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn summary(&self, doc_id: &str) -> Option<&str> {
        self.scratch
            .get(&summary_key(doc_id))
            .and_then(Value::as_str)
    }

    pub fn entities(&self, doc_id: &str) -> Option<Entities> {
        self.scratch
            .get(&entities_key(doc_id))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Whether the store already holds this session's annotation of a document
    pub fn is_stored(&self, doc_id: &str) -> bool {
        self.scratch.contains_key(&stored_key(doc_id))
    }

    /// Whether a tool has failed permanently on a given input
    pub fn failed_permanently(&self, tool: &str, input: &Value) -> bool {
        self.history.iter().any(|c| {
            c.tool == tool && &c.input == input && c.error().is_some_and(|e| !e.is_transient())
        })
    }

    /// Whether a tool has failed on a given input, transiently or not
    pub fn has_failed(&self, tool: &str, input: &Value) -> bool {
        self.history
            .iter()
            .any(|c| c.tool == tool && &c.input == input && c.error().is_some())
    }

    /// Latest model-written answer
    pub fn synthesis(&self) -> Option<Synthesis> {
        self.scratch
            .get(SYNTHESIS_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Most recent failure, if any
    pub fn last_error(&self) -> Option<&AdapterError> {
        self.history.iter().rev().find_map(|c| c.error())
    }

    fn transition(&mut self, next: Status) -> Result<()> {
        if !self.status.can_become(next) {
            return Err(NewsroomError::session(format!(
                "invalid status transition {} -> {}",
                self.status, next
            )));
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn summary_key(doc_id: &str) -> String {
    format!("summary.{}", doc_id)
}

fn entities_key(doc_id: &str) -> String {
    format!("entities.{}", doc_id)
}

fn stored_key(doc_id: &str) -> String {
    format!("stored.{}", doc_id)
}

/// Scratch entries produced by a successful call
fn scratch_updates(
    kind: ToolKind,
    invocation: &Invocation,
    output: &Value,
) -> std::result::Result<Vec<(String, Value)>, AdapterError> {
    let unexpected = |what: &str| {
        AdapterError::permanent(format!(
            "unexpected output from '{}': {}",
            invocation.tool, what
        ))
    };
    let doc_id = || {
        output
            .get("doc_id")
            .or_else(|| invocation.input.get("doc_id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| unexpected("missing doc_id"))
    };

    match kind {
        ToolKind::Retrieve => {
            let hits: Vec<SearchHit> = output
                .get("hits")
                .cloned()
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| unexpected(&e.to_string()))?
                .ok_or_else(|| unexpected("missing hits"))?;
            let query = output
                .get("query")
                .or_else(|| invocation.input.get("query"))
                .and_then(Value::as_str)
                .ok_or_else(|| unexpected("missing query"))?;
            let retrieval = Retrieval {
                query: query.to_string(),
                hits,
            };
            let value = serde_json::to_value(retrieval).map_err(|e| unexpected(&e.to_string()))?;
            Ok(vec![(RETRIEVAL_KEY.to_string(), value)])
        }
        ToolKind::Summarize => {
            let summary = output
                .get("summary")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| unexpected("missing summary"))?;
            Ok(vec![(summary_key(&doc_id()?), json!(summary))])
        }
        ToolKind::Extract => {
            let entities: Entities = output
                .get("entities")
                .cloned()
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| unexpected(&e.to_string()))?
                .ok_or_else(|| unexpected("missing entities"))?;
            let value = serde_json::to_value(entities).map_err(|e| unexpected(&e.to_string()))?;
            Ok(vec![(entities_key(&doc_id()?), value)])
        }
        ToolKind::Store => {
            if invocation.input.get("op").and_then(Value::as_str) == Some("annotate") {
                Ok(vec![(stored_key(&doc_id()?), json!(true))])
            } else {
                Ok(Vec::new())
            }
        }
        ToolKind::Synthesize => {
            let answer = output
                .get("answer")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .ok_or_else(|| unexpected("missing answer"))?;
            let query = invocation
                .input
                .get("query")
                .and_then(Value::as_str)
                .ok_or_else(|| unexpected("missing query"))?;
            let sources = invocation
                .input
                .get("documents")
                .and_then(Value::as_array)
                .map(|docs| {
                    docs.iter()
                        .filter_map(|d| d.get("doc_id").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let synthesis = Synthesis {
                query: query.to_string(),
                sources,
                answer: answer.to_string(),
            };
            let value = serde_json::to_value(synthesis).map_err(|e| unexpected(&e.to_string()))?;
            Ok(vec![(SYNTHESIS_KEY.to_string(), value)])
        }
    }
}

/// Content terms of the effective query, used for ambiguity checks
pub fn query_terms(state: &AgentState) -> Vec<String> {
    text::content_terms(&state.effective_query())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(state: &mut AgentState, kind: ToolKind, tool: &str, input: Value, output: Value) {
        state
            .record(
                kind,
                Invocation::new(tool, input),
                CallOutcome::Success { output },
                5,
                Utc::now(),
            )
            .unwrap();
    }

    fn failure(state: &mut AgentState, tool: &str, input: Value, error: AdapterError) {
        state
            .record(
                ToolKind::Summarize,
                Invocation::new(tool, input),
                CallOutcome::Failure { error },
                5,
                Utc::now(),
            )
            .unwrap();
    }

    #[test]
    fn test_new_state() {
        let state = AgentState::new(Goal::new("Summarize wildfires"));
        assert_eq!(state.status(), Status::Running);
        assert!(state.history().is_empty());
        assert_eq!(state.error_count(), 0);
    }

    #[test]
    fn test_record_merges_scratch() {
        let mut state = AgentState::new(Goal::new("wildfires"));
        success(
            &mut state,
            ToolKind::Retrieve,
            "retrieve",
            json!({ "query": "wildfires", "k": 3 }),
            json!({ "query": "wildfires", "hits": [{ "id": "doc-42", "score": 0.91 }] }),
        );
        success(
            &mut state,
            ToolKind::Summarize,
            "summarize",
            json!({ "doc_id": "doc-42" }),
            json!({ "doc_id": "doc-42", "summary": "Thousands fled." }),
        );

        let retrieval = state.retrieval().unwrap();
        assert_eq!(retrieval.query, "wildfires");
        assert_eq!(retrieval.hits[0].id, "doc-42");
        assert_eq!(state.summary("doc-42"), Some("Thousands fled."));
        assert_eq!(state.history()[1].sequence, 1);
    }

    #[test]
    fn test_unusable_output_becomes_failure() {
        let mut state = AgentState::new(Goal::new("wildfires"));
        success(
            &mut state,
            ToolKind::Summarize,
            "summarize",
            json!({ "doc_id": "doc-42" }),
            json!({ "doc_id": "doc-42" }),
        );

        assert!(!state.history()[0].is_success());
        assert_eq!(state.error_count(), 1);
        assert!(state.summary("doc-42").is_none());
        assert!(state.failed_permanently("summarize", &json!({ "doc_id": "doc-42" })));
    }

    #[test]
    fn test_attempt_numbers() {
        let mut state = AgentState::new(Goal::new("wildfires"));
        let input = json!({ "doc_id": "doc-42" });
        failure(&mut state, "summarize", input.clone(), AdapterError::transient("timeout"));
        failure(&mut state, "summarize", input.clone(), AdapterError::transient("timeout"));
        failure(&mut state, "summarize", json!({ "doc_id": "doc-7" }), AdapterError::transient("timeout"));

        let attempts: Vec<_> = state.history().iter().map(|c| c.attempt).collect();
        assert_eq!(attempts, vec![1, 2, 1]);
        assert_eq!(state.error_count(), 3);
        assert!(!state.failed_permanently("summarize", &input));
    }

    #[test]
    fn test_status_is_monotonic() {
        let mut state = AgentState::new(Goal::new("wildfires"));
        state.finish("done", false).unwrap();

        assert!(state.fail("late").is_err());
        assert!(state.await_input("more?").is_err());
        assert!(state
            .record(
                ToolKind::Retrieve,
                Invocation::new("retrieve", json!({})),
                CallOutcome::Success { output: json!({}) },
                1,
                Utc::now(),
            )
            .is_err());
        assert_eq!(state.status(), Status::Succeeded);
        assert!(state.history().is_empty());
    }

    #[test]
    fn test_resume_appends_clarification() {
        let mut state = AgentState::new(Goal::new("Tell me about it"));
        assert!(state.resume("wildfires").is_err());

        state.await_input("Which topic?").unwrap();
        assert_eq!(state.prompt(), Some("Which topic?"));
        assert!(state.resume("  ").is_err());

        state.resume("wildfires in Region X").unwrap();
        assert_eq!(state.status(), Status::Running);
        assert!(state.prompt().is_none());
        assert_eq!(state.effective_query(), "Tell me about it wildfires in Region X");
        assert_eq!(query_terms(&state), vec!["wildfires", "region"]);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut state = AgentState::new(Goal::new("wildfires"));
        failure(&mut state, "summarize", json!({ "doc_id": "doc-1" }), AdapterError::permanent("gone"));
        state.await_input("Which region?").unwrap();

        let json = serde_json::to_string(&state).unwrap();
        let restored: AgentState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.status(), Status::AwaitingInput);
    }
}
