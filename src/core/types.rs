//! Shared types used across Newsroom modules
//!
//! Contains the goal, document, tool contract and tool call records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::AdapterError;

/// What the user wants out of the retrieved documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// A summary of the relevant documents
    Summarize,
    /// The key entities and facts of the relevant documents
    Extract,
    /// A grounded answer built from both
    Answer,
}

impl Intent {
    /// Infer the intent from the wording of a query
    pub fn infer(query: &str) -> Self {
        let q = query.to_lowercase();
        let wants_summary = ["summar", "overview", "gist", "tl;dr", "recap"]
            .iter()
            .any(|k| q.contains(k));
        let wants_entities = [
            "entit", "extract", "who ", "who's", "people", "organization", "organisation",
            "location", "key facts",
        ]
        .iter()
        .any(|k| q.contains(k));

        match (wants_summary, wants_entities) {
            (true, false) => Intent::Summarize,
            (false, true) => Intent::Extract,
            _ => Intent::Answer,
        }
    }

    pub fn needs_summary(self) -> bool {
        matches!(self, Intent::Summarize | Intent::Answer)
    }

    pub fn needs_entities(self) -> bool {
        matches!(self, Intent::Extract | Intent::Answer)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Summarize => write!(f, "summarize"),
            Intent::Extract => write!(f, "extract"),
            Intent::Answer => write!(f, "answer"),
        }
    }
}

/// Optional structured constraints attached to a goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Number of documents the answer should cover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    /// Whether the answer must be grounded in retrieved documents
    #[serde(default = "default_true")]
    pub require_grounding: bool,
    /// Explicit intent, overriding inference from the query text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

fn default_true() -> bool {
    true
}

impl Constraints {
    /// Number of documents to cover; zero is treated as one
    pub fn result_limit(&self) -> Option<usize> {
        self.max_results.map(|max| max.max(1))
    }
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_results: None,
            require_grounding: true,
            intent: None,
        }
    }
}

/// The user's query. Never mutated after the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    query: String,
    #[serde(default)]
    constraints: Constraints,
}

impl Goal {
    /// Create a goal with default constraints
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            constraints: Constraints::default(),
        }
    }

    /// Create a goal with explicit constraints
    pub fn with_constraints(query: impl Into<String>, constraints: Constraints) -> Self {
        Self {
            query: query.into(),
            constraints,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Explicit intent if given, otherwise inferred from the query
    pub fn intent(&self) -> Intent {
        self.constraints
            .intent
            .unwrap_or_else(|| Intent::infer(&self.query))
    }
}

/// Structured facts extracted from an article
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default, alias = "main_event_or_topic")]
    pub main_event: Option<String>,
    #[serde(default, alias = "key_people")]
    pub people: Vec<String>,
    #[serde(default, alias = "key_organizations")]
    pub organizations: Vec<String>,
    #[serde(default, alias = "key_locations")]
    pub locations: Vec<String>,
    #[serde(default, alias = "dates_and_times")]
    pub dates: Vec<String>,
    #[serde(default, alias = "quantitative_information")]
    pub quantities: Vec<String>,
    #[serde(default, alias = "outcome_or_impact")]
    pub outcome: Option<String>,
    /// Named mentions without a resolved type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,
}

impl Entities {
    /// True when nothing at all was extracted
    pub fn is_empty(&self) -> bool {
        self.main_event.is_none()
            && self.outcome.is_none()
            && self.people.is_empty()
            && self.organizations.is_empty()
            && self.locations.is_empty()
            && self.dates.is_empty()
            && self.quantities.is_empty()
            && self.mentions.is_empty()
    }

    /// Render as a single line, skipping empty groups
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref event) = self.main_event {
            parts.push(format!("Topic: {}", event));
        }
        for (label, values) in [
            ("People", &self.people),
            ("Organizations", &self.organizations),
            ("Locations", &self.locations),
            ("Dates", &self.dates),
            ("Figures", &self.quantities),
            ("Mentions", &self.mentions),
        ] {
            if !values.is_empty() {
                parts.push(format!("{}: {}", label, values.join(", ")));
            }
        }
        if let Some(ref outcome) = self.outcome {
            parts.push(format!("Outcome: {}", outcome));
        }
        parts.join("; ")
    }
}

/// A processed article as produced by the ingestion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Entities>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Human-written summary used by offline evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_summary: Option<String>,
}

impl Document {
    /// Create a raw, unprocessed document
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            title: None,
            summary: None,
            entities: None,
            embedding: Vec::new(),
            reference_summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_entities(mut self, entities: Entities) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// One nearest-neighbour result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// Order hits by score (highest first), then by id (lowest first)
pub fn rank_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
}

/// Category of a registered tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Retrieve,
    Extract,
    Summarize,
    Store,
    /// Writes the final answer from the gathered artifacts
    Synthesize,
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolKind::Retrieve => write!(f, "retrieve"),
            ToolKind::Extract => write!(f, "extract"),
            ToolKind::Summarize => write!(f, "summarize"),
            ToolKind::Store => write!(f, "store"),
            ToolKind::Synthesize => write!(f, "synthesize"),
        }
    }
}

/// Contract of a registered tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique name used for dispatch
    pub name: String,
    pub kind: ToolKind,
    pub description: String,
    /// JSON Schema the call input must satisfy
    pub input_schema: serde_json::Value,
    /// JSON Schema describing the call output
    pub output_schema: serde_json::Value,
    /// Whether a retry after a transient failure is free of side effects
    pub idempotent: bool,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, kind: ToolKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            input_schema: serde_json::json!({ "type": "object" }),
            output_schema: serde_json::json!({ "type": "object" }),
            idempotent: true,
            timeout_ms: 30_000,
        }
    }

    pub fn input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn output_schema(mut self, schema: serde_json::Value) -> Self {
        self.output_schema = schema;
        self
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A tool invocation the planner wants performed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub tool: String,
    pub input: serde_json::Value,
}

impl Invocation {
    pub fn new(tool: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            input,
        }
    }
}

/// Result of one tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CallOutcome {
    Success { output: serde_json::Value },
    Failure { error: AdapterError },
}

/// Record of one executed tool call. Immutable once appended to history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Position in the session history (0-indexed)
    pub sequence: usize,
    pub tool: String,
    pub input: serde_json::Value,
    pub outcome: CallOutcome,
    pub latency_ms: u64,
    /// 1 for the first call with this tool and input, 2 for its first retry, ...
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
}

impl ToolCall {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CallOutcome::Success { .. })
    }

    pub fn output(&self) -> Option<&serde_json::Value> {
        match self.outcome {
            CallOutcome::Success { ref output } => Some(output),
            CallOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&AdapterError> {
        match self.outcome {
            CallOutcome::Success { .. } => None,
            CallOutcome::Failure { ref error } => Some(error),
        }
    }
}
