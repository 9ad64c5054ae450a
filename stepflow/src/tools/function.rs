//! Tools backed by plain functions.

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::Arc;

use super::definitions::{ToolMetadata, ToolOutput};
use super::registry::Tool;
use crate::errors::ToolError;

type ToolFn = dyn Fn(&Map<String, Value>) -> Result<Value, ToolError> + Send + Sync;

/// A [`Tool`] wrapping a synchronous function of the keyword arguments.
#[derive(Clone)]
pub struct FunctionTool {
    metadata: ToolMetadata,
    func: Arc<ToolFn>,
}

impl FunctionTool {
    /// Creates a tool from metadata and a function.
    pub fn new<F>(metadata: ToolMetadata, func: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            metadata,
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.metadata.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, kwargs: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let output = (self.func)(kwargs)?;
        Ok(ToolOutput::ok(
            &self.metadata.name,
            Value::Object(kwargs.clone()),
            output,
        ))
    }
}

/// Reads a required numeric argument.
pub fn number_arg<'a>(
    tool: &str,
    kwargs: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a Number, ToolError> {
    match kwargs.get(name) {
        Some(Value::Number(n)) => Ok(n),
        Some(other) => Err(ToolError::invalid_argument(
            tool,
            name,
            format!("expected a number, got {other}"),
        )),
        None => Err(ToolError::invalid_argument(tool, name, "missing")),
    }
}

/// Reads a required string argument.
pub fn string_arg<'a>(
    tool: &str,
    kwargs: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a str, ToolError> {
    match kwargs.get(name) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(ToolError::invalid_argument(
            tool,
            name,
            format!("expected a string, got {other}"),
        )),
        None => Err(ToolError::invalid_argument(tool, name, "missing")),
    }
}

fn arithmetic(
    tool: &'static str,
    kwargs: &Map<String, Value>,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, ToolError> {
    let a = number_arg(tool, kwargs, "x")?;
    let b = number_arg(tool, kwargs, "y")?;

    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return int_op(x, y)
            .map(Value::from)
            .ok_or_else(|| ToolError::execution_failed(tool, "integer overflow"));
    }

    let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
        return Err(ToolError::execution_failed(tool, "operands are not finite"));
    };
    Number::from_f64(float_op(x, y))
        .map(Value::Number)
        .ok_or_else(|| ToolError::execution_failed(tool, "result is not finite"))
}

fn binary_metadata(name: &str, description: &str) -> ToolMetadata {
    ToolMetadata::new(name, description)
        .with_argument("x", "number", "First operand")
        .with_argument("y", "number", "Second operand")
}

/// A tool adding two numbers.
#[must_use]
pub fn add_tool() -> FunctionTool {
    FunctionTool::new(
        binary_metadata("add", "Useful function to add two numbers."),
        |kwargs| arithmetic("add", kwargs, i64::checked_add, |x, y| x + y),
    )
}

/// A tool multiplying two numbers.
#[must_use]
pub fn multiply_tool() -> FunctionTool {
    FunctionTool::new(
        binary_metadata("multiply", "Useful function to multiply two numbers."),
        |kwargs| arithmetic("multiply", kwargs, i64::checked_mul, |x, y| x * y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn kwargs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_add_integers() {
        let output = add_tool()
            .call(&kwargs(json!({"x": 103_223, "y": 320_292})))
            .await
            .unwrap();

        assert_eq!(output.content, "423515");
        assert_eq!(output.raw_output, json!(423_515));
        assert_eq!(output.tool_name, "add");
    }

    #[tokio::test]
    async fn test_multiply_floats() {
        let output = multiply_tool()
            .call(&kwargs(json!({"x": 2.5, "y": 4})))
            .await
            .unwrap();
        assert_eq!(output.raw_output, json!(10.0));
    }

    #[tokio::test]
    async fn test_missing_and_mistyped_arguments() {
        let err = add_tool().call(&kwargs(json!({"x": 1}))).await.unwrap_err();
        assert_eq!(err, ToolError::invalid_argument("add", "y", "missing"));

        let err = add_tool()
            .call(&kwargs(json!({"x": "one", "y": 2})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { argument, .. } if argument == "x"));
    }

    #[tokio::test]
    async fn test_overflow_is_execution_failure() {
        let err = multiply_tool()
            .call(&kwargs(json!({"x": i64::MAX, "y": 2})))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error calling tool multiply"));
    }

    #[tokio::test]
    async fn test_custom_function_tool() {
        let shout = FunctionTool::new(
            ToolMetadata::new("shout", "Upper-cases text").with_argument("text", "string", "input"),
            |kwargs| Ok(Value::from(string_arg("shout", kwargs, "text")?.to_uppercase())),
        );

        let output = shout.call(&kwargs(json!({"text": "ahoy"}))).await.unwrap();
        assert_eq!(output.content, "AHOY");
        assert_eq!(format!("{shout:?}"), "FunctionTool { name: \"shout\", .. }");
    }
}
