//! Summarizer tool
//!
//! Produces a summary for one stored document. Precomputed pipeline summaries
//! are returned as-is; otherwise the generative model writes a one-sentence
//! abstractive summary, or, without a model, the highest-scoring sentences are
//! selected extractively.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::text;
use crate::core::{AdapterError, ToolKind, ToolSpec};
use crate::services::{DocumentStore, TextModel};
use crate::tools::{fetch_document, parse_input, prompts, Capability, DocInput, SUMMARIZE};

/// Sentences kept by the extractive fallback
const EXTRACTIVE_SENTENCES: usize = 3;

/// Summarization over stored documents
pub struct SummarizerTool {
    store: Arc<dyn DocumentStore>,
    model: Option<Arc<dyn TextModel>>,
}

impl SummarizerTool {
    pub fn new(store: Arc<dyn DocumentStore>, model: Option<Arc<dyn TextModel>>) -> Self {
        Self { store, model }
    }

    /// Contract under the default tool name
    pub fn spec() -> ToolSpec {
        ToolSpec::new(SUMMARIZE, ToolKind::Summarize, "Summarize one document")
            .input_schema(json!({
                "type": "object",
                "properties": { "doc_id": { "type": "string", "minLength": 1 } },
                "required": ["doc_id"]
            }))
            .output_schema(json!({
                "type": "object",
                "properties": {
                    "doc_id": { "type": "string" },
                    "summary": { "type": "string" },
                    "source": { "enum": ["precomputed", "model", "extractive"] }
                },
                "required": ["doc_id", "summary"]
            }))
    }
}

/// Pick the sentences whose content terms are most frequent in the document,
/// returned in their original order
pub fn extractive_summary(article: &str, max_sentences: usize) -> String {
    let sentences = text::sentences(article);
    if sentences.len() <= max_sentences {
        return sentences.join(" ");
    }

    let mut freq: HashMap<String, usize> = HashMap::new();
    for term in text::content_terms(article) {
        *freq.entry(term).or_insert(0) += 1;
    }

    let mut scored: Vec<(usize, f32)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let terms = text::content_terms(s);
            if terms.is_empty() {
                return (i, 0.0);
            }
            let total: usize = terms.iter().map(|t| freq.get(t).copied().unwrap_or(0)).sum();
            (i, total as f32 / (terms.len() as f32).sqrt())
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut chosen: Vec<usize> = scored.iter().take(max_sentences).map(|(i, _)| *i).collect();
    chosen.sort_unstable();

    chosen
        .into_iter()
        .map(|i| sentences[i].as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Capability for SummarizerTool {
    async fn invoke(&self, input: Value) -> Result<Value, AdapterError> {
        let input: DocInput = parse_input(input)?;
        let doc = fetch_document(self.store.as_ref(), &input.doc_id).await?;

        if let Some(summary) = doc.summary.filter(|s| !s.trim().is_empty()) {
            return Ok(json!({ "doc_id": doc.id, "summary": summary, "source": "precomputed" }));
        }

        if doc.text.trim().is_empty() {
            return Err(AdapterError::permanent(format!(
                "document '{}' has no text to summarize",
                doc.id
            )));
        }

        let (summary, source) = match self.model {
            Some(ref model) => {
                let raw = model.generate(&prompts::summarization_prompt(&doc.text)).await?;
                (raw.trim().to_string(), "model")
            }
            None => (extractive_summary(&doc.text, EXTRACTIVE_SENTENCES), "extractive"),
        };

        if summary.is_empty() {
            return Err(AdapterError::permanent(format!(
                "empty summary for document '{}'",
                doc.id
            )));
        }

        Ok(json!({ "doc_id": doc.id, "summary": summary, "source": source }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Document;
    use crate::services::{InMemoryStore, ServiceResult};

    struct FixedModel(&'static str);

    #[async_trait]
    impl TextModel for FixedModel {
        async fn generate(&self, _prompt: &str) -> ServiceResult<String> {
            Ok(self.0.to_string())
        }
    }

    async fn store_with(doc: Document) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.put(doc).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_precomputed_summary_wins() {
        let store = store_with(
            Document::new("doc-42", "Long text.").with_summary("Wildfires displaced thousands."),
        )
        .await;
        let tool = SummarizerTool::new(store, Some(Arc::new(FixedModel("unused"))));

        let output = tool.invoke(json!({ "doc_id": "doc-42" })).await.unwrap();
        assert_eq!(output["summary"], "Wildfires displaced thousands.");
        assert_eq!(output["source"], "precomputed");
    }

    #[tokio::test]
    async fn test_model_summary() {
        let store = store_with(Document::new("doc-1", "Rates rose again.")).await;
        let tool = SummarizerTool::new(store, Some(Arc::new(FixedModel("  The bank raised rates.\n"))));

        let output = tool.invoke(json!({ "doc_id": "doc-1" })).await.unwrap();
        assert_eq!(output["summary"], "The bank raised rates.");
        assert_eq!(output["source"], "model");
    }

    #[tokio::test]
    async fn test_missing_document_is_permanent() {
        let tool = SummarizerTool::new(Arc::new(InMemoryStore::new()), None);
        let err = tool.invoke(json!({ "doc_id": "doc-404" })).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.message.contains("doc-404"));
    }

    #[test]
    fn test_extractive_summary_keeps_order() {
        let article = "Wildfires burned across the valley. The weather was mild on Tuesday. \
                       Officials said wildfires forced thousands from the valley. \
                       A local bakery opened.";
        let summary = extractive_summary(article, 2);
        assert_eq!(
            summary,
            "Wildfires burned across the valley. Officials said wildfires forced thousands from the valley."
        );
    }

    #[test]
    fn test_extractive_summary_short_text() {
        assert_eq!(extractive_summary("One sentence only.", 3), "One sentence only.");
    }
}
