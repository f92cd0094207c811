//! Tools module - capability adapters and the tool registry
//!
//! Each adapter wraps one external service behind the uniform `Capability`
//! interface: JSON in, JSON out, failures classified as transient or permanent.

pub mod extractor;
pub mod prompts;
pub mod registry;
pub mod retriever;
pub mod store;
pub mod summarizer;
pub mod synthesizer;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::core::{AdapterError, Document, Result};
use crate::services::{DocumentStore, Services};

pub use extractor::ExtractorTool;
pub use registry::{RegisteredTool, ToolRegistry};
pub use retriever::RetrieverTool;
pub use store::StoreTool;
pub use summarizer::SummarizerTool;
pub use synthesizer::SynthesizerTool;

pub const RETRIEVE: &str = "retrieve";
pub const EXTRACT: &str = "extract";
pub const SUMMARIZE: &str = "summarize";
pub const STORE: &str = "store";
pub const SYNTHESIZE: &str = "synthesize";

/// Uniform interface over one external capability
#[async_trait]
pub trait Capability: Send + Sync {
    /// Perform the call. Input has already been validated against the
    /// tool's input schema.
    async fn invoke(&self, input: Value) -> std::result::Result<Value, AdapterError>;
}

/// Deserialize a call input; a shape mismatch is permanent
pub(crate) fn parse_input<T: DeserializeOwned>(input: Value) -> std::result::Result<T, AdapterError> {
    serde_json::from_value(input).map_err(|e| AdapterError::permanent(format!("malformed input: {}", e)))
}

/// Input shared by the per-document tools
#[derive(Debug, Deserialize)]
pub(crate) struct DocInput {
    pub doc_id: String,
}

/// Load a document, treating absence as a permanent failure
pub(crate) async fn fetch_document(
    store: &dyn DocumentStore,
    id: &str,
) -> std::result::Result<Document, AdapterError> {
    store
        .get(id)
        .await?
        .ok_or_else(|| AdapterError::permanent(format!("document '{}' not found", id)))
}

/// Register the standard adapters over the given services. The synthesizer
/// is only available with a generative model.
pub fn build_registry(services: &Services, tool_timeout_ms: u64) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(
        RetrieverTool::spec().timeout_ms(tool_timeout_ms),
        RetrieverTool::new(services.embedder.clone(), services.index.clone()),
    )?;
    registry.register(
        SummarizerTool::spec().timeout_ms(tool_timeout_ms),
        SummarizerTool::new(services.store.clone(), services.model.clone()),
    )?;
    registry.register(
        ExtractorTool::spec().timeout_ms(tool_timeout_ms),
        ExtractorTool::new(services.store.clone(), services.model.clone()),
    )?;
    registry.register(
        StoreTool::spec().timeout_ms(tool_timeout_ms),
        StoreTool::new(services.store.clone()),
    )?;
    if let Some(ref model) = services.model {
        registry.register(
            SynthesizerTool::spec().timeout_ms(tool_timeout_ms),
            SynthesizerTool::new(model.clone()),
        )?;
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ToolKind;

    #[test]
    fn test_build_registry() {
        let registry = build_registry(&Services::local(64), 5_000).unwrap();
        let names: Vec<_> = registry.list().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![RETRIEVE, SUMMARIZE, EXTRACT, STORE]);
        assert_eq!(registry.first_of_kind(ToolKind::Store).unwrap().timeout_ms, 5_000);
        assert!(registry.list().iter().all(|s| s.idempotent));
        assert!(registry.first_of_kind(ToolKind::Synthesize).is_none());
    }

    struct Silent;

    #[async_trait]
    impl crate::services::TextModel for Silent {
        async fn generate(&self, _prompt: &str) -> crate::services::ServiceResult<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_model_enables_synthesizer() {
        let mut services = Services::local(64);
        services.model = Some(std::sync::Arc::new(Silent));
        let registry = build_registry(&services, 5_000).unwrap();
        let names: Vec<_> = registry.list().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![RETRIEVE, SUMMARIZE, EXTRACT, STORE, SYNTHESIZE]);
    }

    #[test]
    fn test_parse_input_is_permanent() {
        let err = parse_input::<DocInput>(serde_json::json!({ "id": 1 })).unwrap_err();
        assert!(!err.is_transient());
        assert!(err.message.starts_with("malformed input"));
    }
}
