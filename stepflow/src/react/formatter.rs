//! Prompt construction for the ReAct loop.

use std::fmt::Write as _;

use super::types::ReasoningStep;
use crate::llm::ChatMessage;
use crate::tools::ToolMetadata;

const SYSTEM_HEADER: &str = r#"You are designed to help with a variety of tasks, from answering questions to providing summaries to other types of analyses.

## Tools

You have access to a wide variety of tools. You are responsible for using the tools in any sequence you deem appropriate to complete the task at hand.
This may require breaking the task into subtasks and using different tools to complete each subtask.

You have access to the following tools:
{tool_desc}
{context}
## Output Format

Please answer in the same language as the question and use the following format:

```
Thought: The current language of the user is: (user's language). I need to use a tool to help me answer the question.
Action: tool name (one of {tool_names}) if using a tool.
Action Input: the input to the tool, in a JSON format representing the kwargs (e.g. {"input": "hello world", "num_beams": 5})
```

Please ALWAYS start with a Thought.

NEVER surround your response with markdown code markers. You may use code markers within your response if you need to.

Please use a valid JSON format for the Action Input. Do NOT do this {'input': 'hello world', 'num_beams': 5}.

If this format is used, the tool will respond in the following format:

```
Observation: tool response
```

You should keep repeating the above format till you have enough information to answer the question without using any more tools. At that point, you MUST respond in one of the following two formats:

```
Thought: I can answer without using any more tools. I'll use the user's language to answer
Answer: [your answer here (In the same language as the user's question)]
```

```
Thought: I cannot answer the question with the provided tools.
Answer: [your answer here (In the same language as the user's question)]
```

## Current Conversation

Below is the current conversation consisting of interleaving human and assistant messages."#;

/// Builds the message list sent to the model on each iteration.
#[derive(Debug, Clone, Default)]
pub struct ReActChatFormatter {
    context: String,
}

impl ReActChatFormatter {
    /// Creates a formatter with no extra context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds background text shown to the model under the tool list.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Renders the system header for `tools`.
    #[must_use]
    pub fn system_header(&self, tools: &[&ToolMetadata]) -> String {
        let mut tool_desc = String::new();
        for tool in tools {
            let _ = writeln!(
                tool_desc,
                "> Tool Name: {}\nTool Description: {}\nTool Args: {}\n",
                tool.name,
                tool.description,
                tool.parameters_json()
            );
        }
        let tool_names = tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ");
        let context = if self.context.trim().is_empty() {
            String::new()
        } else {
            format!(
                "\nHere is some context to help you answer the question and plan:\n{}\n",
                self.context.trim()
            )
        };

        SYSTEM_HEADER
            .replace("{tool_desc}", &tool_desc)
            .replace("{tool_names}", &tool_names)
            .replace("{context}", &context)
    }

    /// Returns the system header, the chat history, then the scratchpad.
    ///
    /// Observations are sent as user messages and the model's own steps as
    /// assistant messages.
    #[must_use]
    pub fn format(
        &self,
        tools: &[&ToolMetadata],
        history: &[ChatMessage],
        reasoning: &[ReasoningStep],
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(1 + history.len() + reasoning.len());
        messages.push(ChatMessage::system(self.system_header(tools)));
        messages.extend_from_slice(history);
        messages.extend(reasoning.iter().map(|step| match step {
            ReasoningStep::Observation { .. } => ChatMessage::user(step.content()),
            _ => ChatMessage::assistant(step.content()),
        }));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;
    use crate::tools::{add_tool, multiply_tool, Tool};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_lists_tools() {
        let add = add_tool();
        let multiply = multiply_tool();
        let header = ReActChatFormatter::new().system_header(&[add.metadata(), multiply.metadata()]);

        assert!(header.contains("> Tool Name: add\nTool Description: Useful function to add two numbers."));
        assert!(header.contains("(one of add, multiply)"));
        assert!(!header.contains("{tool_desc}"));
        assert!(!header.contains("Here is some context"));
    }

    #[test]
    fn test_context_is_included() {
        let header = ReActChatFormatter::new()
            .with_context("Numbers are in base ten.")
            .system_header(&[]);
        assert!(header.contains("Here is some context to help you answer the question and plan:\nNumbers are in base ten."));
    }

    #[test]
    fn test_format_orders_messages() {
        let history = vec![ChatMessage::user("what is 1+2")];
        let reasoning = vec![
            ReasoningStep::Action {
                thought: "add".into(),
                action: "add".into(),
                action_input: serde_json::Map::new(),
            },
            ReasoningStep::observation("3"),
        ];

        let messages = ReActChatFormatter::new().format(&[], &history, &reasoning);
        let roles: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
        assert_eq!(messages[3].content, "Observation: 3");
    }
}
