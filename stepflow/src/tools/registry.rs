//! The tool trait and a name-indexed registry.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::sync::Arc;

use super::definitions::{ToolMetadata, ToolOutput, ToolSelection};
use crate::errors::ToolError;

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync + Debug {
    /// Returns the tool description.
    fn metadata(&self) -> &ToolMetadata;

    /// Returns the tool name.
    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Calls the tool with keyword arguments.
    async fn call(&self, kwargs: &Map<String, Value>) -> Result<ToolOutput, ToolError>;
}

/// Ordered collection of tools looked up by name.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool, replacing any tool with the same name.
    #[must_use]
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Arc::new(tool));
        self
    }

    /// Adds a shared tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if let Some(slot) = self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            *slot = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Returns the tool names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Returns the metadata of every tool in registration order.
    #[must_use]
    pub fn metadata(&self) -> Vec<&ToolMetadata> {
        self.tools.iter().map(|t| t.metadata()).collect()
    }

    /// Returns the number of tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Calls the selected tool.
    pub async fn call(&self, selection: &ToolSelection) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(&selection.tool_name)
            .ok_or_else(|| ToolError::not_found(&selection.tool_name))?;
        tool.call(&selection.tool_kwargs).await
    }

    /// Calls the selected tool and turns any failure into an error output
    /// whose content can be shown to a model.
    pub async fn call_as_observation(&self, selection: &ToolSelection) -> ToolOutput {
        match self.call(selection).await {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!(tool = %selection.tool_name, error = %err, "Tool call failed");
                ToolOutput::error(
                    &selection.tool_name,
                    Value::Object(selection.tool_kwargs.clone()),
                    err.to_string(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{add_tool, multiply_tool};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn kwargs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_call_by_name() {
        let registry = ToolRegistry::new().with_tool(add_tool()).with_tool(multiply_tool());
        assert_eq!(registry.names(), vec!["add", "multiply"]);

        let output = registry
            .call(&ToolSelection::new("fake", "multiply", kwargs(json!({"x": 6, "y": 7}))))
            .await
            .unwrap();
        assert_eq!(output.content, "42");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new().with_tool(add_tool());
        let selection = ToolSelection::new("fake", "divide", Map::new());

        let err = registry.call(&selection).await.unwrap_err();
        assert_eq!(err, ToolError::not_found("divide"));

        let observation = registry.call_as_observation(&selection).await;
        assert!(observation.is_error);
        assert_eq!(observation.content, "Tool divide does not exist");
    }

    #[tokio::test]
    async fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new().with_tool(add_tool());
        registry.register(Arc::new(add_tool()));
        assert_eq!(registry.len(), 1);
    }
}
