//! Extractor tool
//!
//! Pulls structured entities out of one stored document. Uses the pipeline's
//! precomputed entities when present, asks the generative model otherwise,
//! and falls back to a surface heuristic when running without a model.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::text;
use crate::core::{AdapterError, Entities, ToolKind, ToolSpec};
use crate::services::{DocumentStore, TextModel};
use crate::tools::{fetch_document, parse_input, prompts, Capability, DocInput, EXTRACT};

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday", "yesterday", "today",
];

/// Entity extraction over stored documents
pub struct ExtractorTool {
    store: Arc<dyn DocumentStore>,
    model: Option<Arc<dyn TextModel>>,
}

impl ExtractorTool {
    pub fn new(store: Arc<dyn DocumentStore>, model: Option<Arc<dyn TextModel>>) -> Self {
        Self { store, model }
    }

    /// Contract under the default tool name
    pub fn spec() -> ToolSpec {
        ToolSpec::new(EXTRACT, ToolKind::Extract, "Extract key entities from one document")
            .input_schema(json!({
                "type": "object",
                "properties": { "doc_id": { "type": "string", "minLength": 1 } },
                "required": ["doc_id"]
            }))
            .output_schema(json!({
                "type": "object",
                "properties": {
                    "doc_id": { "type": "string" },
                    "entities": { "type": "object" },
                    "source": { "enum": ["precomputed", "model", "heuristic"] }
                },
                "required": ["doc_id", "entities"]
            }))
    }
}

/// Parse a model reply into entities. Markdown code fences and any prose
/// around the outermost JSON object are ignored.
pub fn parse_entities(raw: &str) -> Result<Entities, AdapterError> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let body = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => {
            return Err(AdapterError::permanent(format!(
                "model reply contains no JSON object: {}",
                text::preview(cleaned, 80)
            )))
        }
    };

    serde_json::from_str(body)
        .map_err(|e| AdapterError::permanent(format!("unparseable extraction: {}", e)))
}

/// Surface-level extraction: figures, dates and capitalized name runs
pub fn heuristic_entities(article: &str) -> Entities {
    let mut entities = Entities {
        main_event: text::sentences(article).into_iter().next(),
        ..Default::default()
    };

    for sentence in text::sentences(article) {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        let mut run: Vec<&str> = Vec::new();

        for (i, raw) in words.iter().enumerate() {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '%' && c != '$');
            if word.is_empty() {
                flush_run(&mut run, &mut entities.mentions);
                continue;
            }

            let lower = word.to_lowercase();
            if is_year(word) || MONTHS.contains(&lower.as_str()) {
                flush_run(&mut run, &mut entities.mentions);
                push_unique(&mut entities.dates, word);
            } else if word.chars().any(|c| c.is_ascii_digit()) {
                flush_run(&mut run, &mut entities.mentions);
                push_unique(&mut entities.quantities, word);
            } else if word.chars().next().is_some_and(char::is_uppercase)
                && !(i == 0 && text::content_terms(word).is_empty())
            {
                run.push(word);
            } else {
                flush_run(&mut run, &mut entities.mentions);
            }

            if raw.ends_with(',') || raw.ends_with(';') {
                flush_run(&mut run, &mut entities.mentions);
            }
        }
        flush_run(&mut run, &mut entities.mentions);
    }

    entities
}

fn is_year(word: &str) -> bool {
    word.len() == 4
        && word.chars().all(|c| c.is_ascii_digit())
        && (word.starts_with("19") || word.starts_with("20"))
}

fn flush_run(run: &mut Vec<&str>, out: &mut Vec<String>) {
    if !run.is_empty() {
        push_unique(out, &run.join(" "));
        run.clear();
    }
}

fn push_unique(out: &mut Vec<String>, value: &str) {
    if !out.iter().any(|v| v == value) {
        out.push(value.to_string());
    }
}

#[async_trait]
impl Capability for ExtractorTool {
    async fn invoke(&self, input: Value) -> Result<Value, AdapterError> {
        let input: DocInput = parse_input(input)?;
        let doc = fetch_document(self.store.as_ref(), &input.doc_id).await?;

        if let Some(entities) = doc.entities.filter(|e| !e.is_empty()) {
            return Ok(json!({ "doc_id": doc.id, "entities": entities, "source": "precomputed" }));
        }

        if doc.text.trim().is_empty() {
            return Err(AdapterError::permanent(format!(
                "document '{}' has no text to extract from",
                doc.id
            )));
        }

        let (entities, source) = match self.model {
            Some(ref model) => {
                let raw = model.generate(&prompts::extraction_prompt(&doc.text)).await?;
                (parse_entities(&raw)?, "model")
            }
            None => (heuristic_entities(&doc.text), "heuristic"),
        };

        Ok(json!({ "doc_id": doc.id, "entities": entities, "source": source }))
    }
}
