//! Testing utilities for stepflow workflows.
//!
//! This module provides:
//! - Mock steps with configurable output
//! - Helpers for draining and checking event streams
//! - A scripted LLM client, re-exported from [`crate::llm`]

mod assertions;
mod mocks;

pub use crate::llm::ScriptedLlm;
pub use assertions::{assert_contains_tag, assert_tags, collect_events, tags_of};
pub use mocks::{EmitStep, FailingStep, SlowStep};
