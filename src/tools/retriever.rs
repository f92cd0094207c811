//! Retriever tool
//!
//! Embeds the query and asks the search index for the nearest documents.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::{rank_hits, AdapterError, ToolKind, ToolSpec};
use crate::services::{Embedder, SearchIndex};
use crate::tools::{parse_input, Capability, RETRIEVE};

#[derive(Debug, Deserialize)]
struct RetrieveInput {
    query: String,
    #[serde(default = "default_k")]
    k: usize,
}

fn default_k() -> usize {
    3
}

/// Semantic search over the indexed corpus
pub struct RetrieverTool {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SearchIndex>,
}

impl RetrieverTool {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn SearchIndex>) -> Self {
        Self { embedder, index }
    }

    /// Contract under the default tool name
    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            RETRIEVE,
            ToolKind::Retrieve,
            "Find the documents most relevant to a query",
        )
        .input_schema(json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "minLength": 1 },
                "k": { "type": "integer", "minimum": 1 }
            },
            "required": ["query"]
        }))
        .output_schema(json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "hits": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "score": { "type": "number" }
                        },
                        "required": ["id", "score"]
                    }
                }
            },
            "required": ["query", "hits"]
        }))
    }
}

#[async_trait]
impl Capability for RetrieverTool {
    async fn invoke(&self, input: Value) -> Result<Value, AdapterError> {
        let input: RetrieveInput = parse_input(input)?;

        let embedding = self.embedder.embed(&input.query).await?;
        let mut hits = self.index.search(&embedding, input.k).await?;
        rank_hits(&mut hits);
        hits.truncate(input.k);

        tracing::debug!(query = %input.query, hits = hits.len(), "retrieval complete");

        Ok(json!({
            "query": input.query,
            "hits": hits,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{FlatIndex, HashingEmbedder};

    #[tokio::test]
    async fn test_retrieve_returns_ranked_hits() {
        let embedder = Arc::new(HashingEmbedder::new(2048));
        let index = Arc::new(FlatIndex::new());
        index
            .upsert("doc-42", embedder.embed_now("wildfires displaced thousands"))
            .await
            .unwrap();
        index
            .upsert("doc-7", embedder.embed_now("wildfire risk rises with drought and heat"))
            .await
            .unwrap();

        let tool = RetrieverTool::new(embedder, index);
        let output = tool
            .invoke(json!({ "query": "wildfires displaced", "k": 1 }))
            .await
            .unwrap();

        let hits = output["hits"].as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], "doc-42");
        assert_eq!(output["query"], "wildfires displaced");
    }

    #[tokio::test]
    async fn test_malformed_input_is_permanent() {
        let tool = RetrieverTool::new(
            Arc::new(HashingEmbedder::new(16)),
            Arc::new(FlatIndex::new()),
        );
        let err = tool.invoke(json!({ "k": 2 })).await.unwrap_err();
        assert!(!err.is_transient());
    }
}
