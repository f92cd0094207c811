//! Document store tool
//!
//! Lets the agent read a stored document or persist the summary and entities
//! it produced. Both operations are idempotent.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::{AdapterError, Entities, ToolKind, ToolSpec};
use crate::services::DocumentStore;
use crate::tools::{parse_input, Capability, STORE};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum StoreInput {
    Get {
        doc_id: String,
    },
    Annotate {
        doc_id: String,
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        entities: Option<Entities>,
    },
}

pub struct StoreTool {
    store: Arc<dyn DocumentStore>,
}

impl StoreTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Contract under the default tool name
    pub fn spec() -> ToolSpec {
        ToolSpec::new(STORE, ToolKind::Store, "Read or annotate a stored document").input_schema(
            json!({
                "type": "object",
                "properties": {
                    "op": { "enum": ["get", "annotate"] },
                    "doc_id": { "type": "string", "minLength": 1 },
                    "summary": { "type": "string" },
                    "entities": { "type": "object" }
                },
                "required": ["op", "doc_id"]
            }),
        )
    }
}

#[async_trait]
impl Capability for StoreTool {
    async fn invoke(&self, input: Value) -> Result<Value, AdapterError> {
        let input: StoreInput = parse_input(input)?;
        match input {
            StoreInput::Get { doc_id } => {
                let doc = self.store.get(&doc_id).await?;
                Ok(json!({
                    "doc_id": doc_id,
                    "found": doc.is_some(),
                    "document": doc,
                }))
            }
            StoreInput::Annotate {
                doc_id,
                summary,
                entities,
            } => {
                if summary.is_none() && entities.is_none() {
                    return Err(AdapterError::permanent(
                        "annotate needs a summary or entities",
                    ));
                }
                let changed = self.store.annotate(&doc_id, summary, entities).await?;
                tracing::debug!(doc = %doc_id, changed, "annotated document");
                Ok(json!({ "doc_id": doc_id, "changed": changed }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Document;
    use crate::services::InMemoryStore;

    async fn tool() -> StoreTool {
        let store = Arc::new(InMemoryStore::new());
        store
            .put(Document::new("doc-42", "Wildfires displaced thousands."))
            .await
            .unwrap();
        StoreTool::new(store)
    }

    #[tokio::test]
    async fn test_get() {
        let tool = tool().await;
        let output = tool
            .invoke(json!({ "op": "get", "doc_id": "doc-42" }))
            .await
            .unwrap();
        assert_eq!(output["found"], true);
        assert_eq!(output["document"]["id"], "doc-42");

        let output = tool
            .invoke(json!({ "op": "get", "doc_id": "doc-1" }))
            .await
            .unwrap();
        assert_eq!(output["found"], false);
    }

    #[tokio::test]
    async fn test_annotate_is_idempotent() {
        let tool = tool().await;
        let input = json!({ "op": "annotate", "doc_id": "doc-42", "summary": "Thousands fled." });

        let first = tool.invoke(input.clone()).await.unwrap();
        let second = tool.invoke(input).await.unwrap();
        assert_eq!(first["changed"], true);
        assert_eq!(second["changed"], false);
    }

    #[tokio::test]
    async fn test_annotate_missing_document() {
        let tool = tool().await;
        let err = tool
            .invoke(json!({ "op": "annotate", "doc_id": "doc-9", "summary": "x" }))
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_annotate_without_payload() {
        let tool = tool().await;
        assert!(tool
            .invoke(json!({ "op": "annotate", "doc_id": "doc-42" }))
            .await
            .is_err());
    }
}
