//! Core domain model types for stepflow.
//!
//! This module contains the fundamental types used throughout the framework:
//! - Tagged events and the typed-event trait
//! - Built-in start, stop and human-in-the-loop events
//! - Run status

mod builtin;
mod event;
mod status;

pub use builtin::{HumanResponseEvent, InputRequiredEvent, StartEvent, StopEvent};
pub use event::{Event, EventTag, TypedEvent};
pub use status::RunStatus;
