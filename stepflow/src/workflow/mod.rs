//! Workflow construction and execution.
//!
//! This module provides:
//! - [`WorkflowBuilder`], which validates step registrations
//! - [`Workflow`], the entry point for starting and resuming runs
//! - [`RunHandle`], the caller's view of a running workflow
//! - [`EventStream`] of published events and [`FlowDiagram`] rendering

mod builder;
mod config;
mod draw;
mod graph;
mod handle;
mod runner;
mod stream;

pub use builder::WorkflowBuilder;
pub use config::WorkflowConfig;
pub use draw::{FlowDiagram, FlowNode, NodeKind};
pub use graph::Workflow;
pub use handle::RunHandle;
pub use stream::{event_channel, EventStream, EventWriter};
