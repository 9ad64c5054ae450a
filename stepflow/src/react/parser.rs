//! Parser for ReAct-formatted model output.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use super::types::ReasoningStep;
use crate::errors::ParseError;

const IMPLICIT_THOUGHT: &str = "(Implicit) I can answer without any more tools!";

fn compiled(
    cell: &'static OnceLock<Result<Regex, regex::Error>>,
    pattern: &str,
) -> Result<&'static Regex, ParseError> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| ParseError::new(format!("Invalid pattern: {e}")))
}

fn answer_pattern() -> Result<&'static Regex, ParseError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    compiled(&PATTERN, r"(?s)Thought:(.*?)Answer:(.*?)$")
}

fn action_pattern() -> Result<&'static Regex, ParseError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    compiled(
        &PATTERN,
        r"(?s)(?:\s*Thought:(.*?)|(.+?))\n+Action:\s*([^\n() ]+).*?\n+Action Input:.*?(\{.*)",
    )
}

/// Parses `Thought / Action / Action Input` and `Thought / Answer` blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReActOutputParser;

impl ReActOutputParser {
    /// Creates a parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parses one model reply into a reasoning step.
    ///
    /// A reply without a `Thought:` line is taken as a direct answer. A tool
    /// call wins over an `Answer:` the model wrote after it.
    pub fn parse(&self, output: &str) -> Result<ReasoningStep, ParseError> {
        if !output.contains("Thought:") {
            return Ok(ReasoningStep::Response {
                thought: IMPLICIT_THOUGHT.to_string(),
                response: output.trim().to_string(),
            });
        }

        if output.contains("Action:") {
            return parse_action(output);
        }

        if output.contains("Answer:") {
            return parse_answer(output);
        }

        Err(ParseError::new(format!("Could not parse output: {output}")).with_raw(output))
    }
}

fn parse_answer(output: &str) -> Result<ReasoningStep, ParseError> {
    let caps = answer_pattern()?.captures(output).ok_or_else(|| {
        ParseError::new(format!("Could not extract final answer from input text: {output}"))
            .with_raw(output)
    })?;

    Ok(ReasoningStep::Response {
        thought: caps[1].trim().to_string(),
        response: caps[2].trim().to_string(),
    })
}

fn parse_action(output: &str) -> Result<ReasoningStep, ParseError> {
    let caps = action_pattern()?.captures(output).ok_or_else(|| {
        ParseError::new(format!("Could not extract tool use from input text: {output}"))
            .with_raw(output)
    })?;

    let thought = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map_or("", |m| m.as_str())
        .trim()
        .to_string();
    let action = caps[3].trim().to_string();
    let raw_input = &caps[4];

    Ok(ReasoningStep::Action {
        thought,
        action,
        action_input: parse_action_input(raw_input)?,
    })
}

/// Decodes the JSON object that starts an `Action Input:` block, tolerating
/// single quotes. Text after the object is ignored.
fn parse_action_input(raw: &str) -> Result<Map<String, Value>, ParseError> {
    let value = first_json_value(raw)
        .or_else(|_| first_json_value(&raw.replace('\'', "\"")))
        .map_err(|e| ParseError::new(format!("Invalid action input: {e}")).with_raw(raw))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ParseError::new(format!("Action input is not an object: {other}")).with_raw(raw)),
    }
}

fn first_json_value(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::Deserializer::from_str(raw)
        .into_iter::<Value>()
        .next()
        .unwrap_or_else(|| serde_json::from_str(raw))
}
