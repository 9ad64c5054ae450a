//! Tool metadata and I/O types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Description of a tool as shown to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// The tool name models refer to.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON Schema of the keyword arguments.
    pub parameters: Value,
}

impl ToolMetadata {
    /// Creates metadata with an empty object schema.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}, "required": []}),
        }
    }

    /// Sets the argument schema.
    #[must_use]
    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }

    /// Adds a required argument to the schema.
    #[must_use]
    pub fn with_argument(mut self, name: &str, json_type: &str, description: &str) -> Self {
        if let Some(props) = self
            .parameters
            .get_mut("properties")
            .and_then(Value::as_object_mut)
        {
            props.insert(
                name.to_string(),
                serde_json::json!({"type": json_type, "description": description}),
            );
        }
        if let Some(required) = self
            .parameters
            .get_mut("required")
            .and_then(Value::as_array_mut)
        {
            required.push(Value::String(name.to_string()));
        }
        self
    }

    /// Returns the schema rendered as compact JSON.
    #[must_use]
    pub fn parameters_json(&self) -> String {
        self.parameters.to_string()
    }
}

/// A tool invocation chosen by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSelection {
    /// Identifier of the call.
    pub tool_id: String,
    /// Name of the tool to call.
    pub tool_name: String,
    /// Keyword arguments.
    #[serde(default)]
    pub tool_kwargs: Map<String, Value>,
}

impl ToolSelection {
    /// Creates a selection.
    #[must_use]
    pub fn new(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_kwargs: Map<String, Value>,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            tool_kwargs,
        }
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Name of the tool that ran.
    pub tool_name: String,
    /// Text shown to the model as the observation.
    pub content: String,
    /// Arguments the tool was called with.
    #[serde(default)]
    pub raw_input: Value,
    /// Structured return value.
    #[serde(default)]
    pub raw_output: Value,
    /// True if `content` describes a failure.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutput {
    /// Creates a successful output. Strings are shown verbatim, other values
    /// as JSON.
    #[must_use]
    pub fn ok(tool_name: impl Into<String>, raw_input: Value, raw_output: Value) -> Self {
        let content = match &raw_output {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            tool_name: tool_name.into(),
            content,
            raw_input,
            raw_output,
            is_error: false,
        }
    }

    /// Creates a failed output whose content is the error message.
    #[must_use]
    pub fn error(tool_name: impl Into<String>, raw_input: Value, message: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            content: message.into(),
            raw_input,
            raw_output: Value::Null,
            is_error: true,
        }
    }
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_metadata_schema_builder() {
        let meta = ToolMetadata::new("add", "Add two numbers")
            .with_argument("a", "number", "first")
            .with_argument("b", "number", "second");

        assert_eq!(meta.parameters["required"], json!(["a", "b"]));
        assert_eq!(meta.parameters["properties"]["a"]["type"], "number");
        assert!(meta.parameters_json().starts_with('{'));
    }

    #[test]
    fn test_output_content_rendering() {
        assert_eq!(ToolOutput::ok("add", json!({}), json!(5)).content, "5");
        assert_eq!(ToolOutput::ok("echo", json!({}), json!("hi")).content, "hi");

        let failed = ToolOutput::error("div", json!({}), "division by zero");
        assert!(failed.is_error);
        assert_eq!(failed.to_string(), "division by zero");
    }

    #[test]
    fn test_selection_deserializes_without_kwargs() {
        let sel: ToolSelection =
            serde_json::from_value(json!({"tool_id": "fake", "tool_name": "add"})).unwrap();
        assert!(sel.tool_kwargs.is_empty());
    }
}
