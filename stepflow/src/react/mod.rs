//! ReAct-style agent: reason, call tools, observe, answer.

mod agent;
mod formatter;
mod parser;
mod types;

pub use agent::{
    InputEvent, PrepEvent, ReActAgent, ReActConfig, ReActResult, StreamEvent, ToolCallEvent,
    ITERATIONS_KEY, MEMORY_KEY, REASONING_KEY, SOURCES_KEY,
};
pub use formatter::ReActChatFormatter;
pub use parser::ReActOutputParser;
pub use types::ReasoningStep;
