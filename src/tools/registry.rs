//! Tool registry - manages and dispatches tool calls
//!
//! Central hub for registering capabilities under a unique name together with
//! their input/output contract. Built once at startup, then shared read-only
//! behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::core::{AdapterError, NewsroomError, Result, ToolKind, ToolSpec};
use crate::tools::Capability;

/// A capability together with its contract and compiled input validator
pub struct RegisteredTool {
    spec: ToolSpec,
    capability: Arc<dyn Capability>,
    validator: jsonschema::Validator,
}

impl RegisteredTool {
    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    /// Shared handle to the capability, for spawning calls
    pub fn capability(&self) -> Arc<dyn Capability> {
        self.capability.clone()
    }

    /// Check a call input against the tool's input schema.
    ///
    /// A violation is permanent: the same input will never become valid.
    pub fn validate(&self, input: &Value) -> std::result::Result<(), AdapterError> {
        let problems: Vec<String> = self
            .validator
            .iter_errors(input)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AdapterError::permanent(format!(
                "invalid input for '{}': {}",
                self.spec.name,
                problems.join("; ")
            )))
        }
    }
}

/// Registry of available tools, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under `spec.name`
    pub fn register(&mut self, spec: ToolSpec, capability: impl Capability + 'static) -> Result<()> {
        self.register_arc(spec, Arc::new(capability))
    }

    /// Register an already shared capability
    pub fn register_arc(&mut self, spec: ToolSpec, capability: Arc<dyn Capability>) -> Result<()> {
        if self.by_name.contains_key(&spec.name) {
            return Err(NewsroomError::DuplicateTool(spec.name));
        }

        let validator = jsonschema::validator_for(&spec.input_schema).map_err(|e| {
            NewsroomError::config(format!("invalid input schema for '{}': {}", spec.name, e))
        })?;

        tracing::debug!(tool = %spec.name, kind = %spec.kind, "registered tool");
        self.by_name.insert(spec.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            spec,
            capability,
            validator,
        });
        Ok(())
    }

    /// Look up a tool by name
    pub fn resolve(&self, name: &str) -> Result<&RegisteredTool> {
        self.by_name
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| NewsroomError::UnknownTool(name.to_string()))
    }

    /// All tool contracts in registration order
    pub fn list(&self) -> Vec<&ToolSpec> {
        self.tools.iter().map(|t| &t.spec).collect()
    }

    /// First registered tool of the given kind
    pub fn first_of_kind(&self, kind: ToolKind) -> Option<&ToolSpec> {
        self.tools.iter().map(|t| &t.spec).find(|s| s.kind == kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Capability for Echo {
        async fn invoke(&self, input: Value) -> std::result::Result<Value, AdapterError> {
            Ok(input)
        }
    }

    fn spec(name: &str, kind: ToolKind) -> ToolSpec {
        ToolSpec::new(name, kind, "test tool").input_schema(json!({
            "type": "object",
            "properties": { "doc_id": { "type": "string" } },
            "required": ["doc_id"]
        }))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry.register(spec("summarize", ToolKind::Summarize), Echo).unwrap();
        registry.register(spec("extract", ToolKind::Extract), Echo).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("extract").unwrap().spec().kind, ToolKind::Extract);

        let names: Vec<_> = registry.list().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["summarize", "extract"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(spec("summarize", ToolKind::Summarize), Echo).unwrap();
        let err = registry
            .register(spec("summarize", ToolKind::Extract), Echo)
            .unwrap_err();
        assert!(matches!(err, NewsroomError::DuplicateTool(ref n) if n == "summarize"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        assert!(matches!(
            registry.resolve("translate"),
            Err(NewsroomError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_first_of_kind() {
        let mut registry = ToolRegistry::new();
        registry.register(spec("fast_summary", ToolKind::Summarize), Echo).unwrap();
        registry.register(spec("slow_summary", ToolKind::Summarize), Echo).unwrap();
        assert_eq!(
            registry.first_of_kind(ToolKind::Summarize).unwrap().name,
            "fast_summary"
        );
        assert!(registry.first_of_kind(ToolKind::Retrieve).is_none());
    }

    #[test]
    fn test_validate_input() {
        let mut registry = ToolRegistry::new();
        registry.register(spec("summarize", ToolKind::Summarize), Echo).unwrap();
        let tool = registry.resolve("summarize").unwrap();

        assert!(tool.validate(&json!({ "doc_id": "doc-1" })).is_ok());

        let err = tool.validate(&json!({ "doc_id": 7 })).unwrap_err();
        assert!(!err.is_transient());
        assert!(err.message.contains("summarize"));

        assert!(tool.validate(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_invoke_through_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(spec("summarize", ToolKind::Summarize), Echo).unwrap();
        let output = registry
            .resolve("summarize")
            .unwrap()
            .capability()
            .invoke(json!({ "doc_id": "doc-1" }))
            .await
            .unwrap();
        assert_eq!(output["doc_id"], "doc-1");
    }
}
