//! Synthesizer tool
//!
//! Writes the final answer to the user's question from the summaries and
//! entities gathered during the session. The model is told to cite each
//! source by its document id.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::{AdapterError, Entities, ToolKind, ToolSpec};
use crate::services::TextModel;
use crate::tools::{parse_input, prompts, Capability, SYNTHESIZE};

#[derive(Debug, Deserialize)]
struct SynthesisInput {
    query: String,
    documents: Vec<SourceDoc>,
}

#[derive(Debug, Deserialize)]
struct SourceDoc {
    doc_id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    entities: Option<Entities>,
}

pub struct SynthesizerTool {
    model: Arc<dyn TextModel>,
}

impl SynthesizerTool {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Contract under the default tool name
    pub fn spec() -> ToolSpec {
        ToolSpec::new(SYNTHESIZE, ToolKind::Synthesize, "Answer the question from gathered sources")
            .input_schema(json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "minLength": 1 },
                    "documents": {
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "properties": {
                                "doc_id": { "type": "string", "minLength": 1 },
                                "summary": { "type": "string" },
                                "entities": { "type": "object" }
                            },
                            "required": ["doc_id"]
                        }
                    }
                },
                "required": ["query", "documents"]
            }))
            .output_schema(json!({
                "type": "object",
                "properties": { "answer": { "type": "string" } },
                "required": ["answer"]
            }))
    }
}

/// Numbered source blocks for the analyst prompt
fn render_sources(documents: &[SourceDoc]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let summary = doc.summary.as_deref().unwrap_or("(none)");
            let facts = doc
                .entities
                .as_ref()
                .map(Entities::describe)
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "(none)".to_string());
            format!(
                "--- Start of Source {n} ---\nSource ID: {id}\nSummary: {summary}\nKey Information Extracted: {facts}\n--- End of Source {n} ---\n",
                n = i + 1,
                id = doc.doc_id,
                summary = summary,
                facts = facts
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Capability for SynthesizerTool {
    async fn invoke(&self, input: Value) -> Result<Value, AdapterError> {
        let input: SynthesisInput = parse_input(input)?;
        if input.documents.is_empty() {
            return Err(AdapterError::permanent("no sources to answer from"));
        }

        let prompt = prompts::news_analyst_prompt(&input.query, &render_sources(&input.documents));
        let answer = self.model.generate(&prompt).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AdapterError::permanent("model returned an empty answer"));
        }

        tracing::debug!(sources = input.documents.len(), "synthesized answer");
        Ok(json!({ "answer": answer }))
    }
}
