//! Tools callable by agents.
//!
//! This module provides:
//! - Tool metadata, selections and outputs
//! - The [`Tool`] trait and [`ToolRegistry`]
//! - [`FunctionTool`] plus the built-in arithmetic tools

mod definitions;
mod function;
mod registry;

pub use definitions::{ToolMetadata, ToolOutput, ToolSelection};
pub use function::{add_tool, multiply_tool, number_arg, string_arg, FunctionTool};
pub use registry::{Tool, ToolRegistry};
