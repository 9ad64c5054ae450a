//! Reasoning steps of a ReAct loop.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the agent's scratchpad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReasoningStep {
    /// The model decided to call a tool.
    Action {
        /// Reasoning before the call.
        thought: String,
        /// Tool name.
        action: String,
        /// Keyword arguments.
        action_input: Map<String, Value>,
    },
    /// Result of a tool call or a note about a failure.
    Observation {
        /// Observation text.
        observation: String,
    },
    /// The model produced its final answer.
    Response {
        /// Reasoning before the answer.
        thought: String,
        /// Final answer.
        response: String,
    },
}

impl ReasoningStep {
    /// Creates an observation.
    #[must_use]
    pub fn observation(text: impl Into<String>) -> Self {
        Self::Observation {
            observation: text.into(),
        }
    }

    /// Returns true for a final answer.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Response { .. })
    }

    /// Renders the step the way it appears in the prompt.
    #[must_use]
    pub fn content(&self) -> String {
        match self {
            Self::Action {
                thought,
                action,
                action_input,
            } => format!(
                "Thought: {thought}\nAction: {action}\nAction Input: {}",
                Value::Object(action_input.clone())
            ),
            Self::Observation { observation } => format!("Observation: {observation}"),
            Self::Response { thought, response } => {
                format!("Thought: {thought}\nAnswer: {response}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_content_rendering() {
        let action = ReasoningStep::Action {
            thought: "I need to add".into(),
            action: "add".into(),
            action_input: json!({"x": 1, "y": 2}).as_object().cloned().unwrap(),
        };
        assert_eq!(
            action.content(),
            "Thought: I need to add\nAction: add\nAction Input: {\"x\":1,\"y\":2}"
        );
        assert_eq!(ReasoningStep::observation("3").content(), "Observation: 3");
        assert!(!action.is_done());
    }

    #[test]
    fn test_serialized_shape() {
        let step = ReasoningStep::Response {
            thought: "done".into(),
            response: "3".into(),
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json, json!({"kind": "response", "thought": "done", "response": "3"}));
        assert!(step.is_done());
    }
}
