//! # Stepflow
//!
//! Event-driven workflows for LLM applications.
//!
//! A [`workflow::Workflow`] is a set of named steps. Each step accepts events
//! of one tag and emits events of other tags; the runner routes every
//! emission to its consumer until a `stop` event ends the run. Steps share a
//! per-run [`context::ContextStore`] that can be snapshotted to JSON and
//! restored into a fresh run, which is how human-in-the-loop pauses survive
//! a restart.
//!
//! On top of the engine the crate ships:
//!
//! - **LLM clients**: a scripted client for tests and an OpenAI client
//!   (feature `openai`) with streaming and retry
//! - **Tools** and a **ReAct agent** that calls them
//! - **Retrieval**: document loading, chunking, embeddings and a query engine
//! - **Flows**: joke, calculator and human-in-the-loop workflows
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepflow::prelude::*;
//!
//! let llm = Arc::new(OpenAiClient::from_env()?);
//! let workflow = joke_flow(llm)?;
//! let critique = workflow.run(joke_start("pirates"))?.await?;
//! println!("{critique}");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod context;
pub mod core;
pub mod errors;
pub mod flows;
pub mod llm;
pub mod observability;
pub mod react;
pub mod retrieval;
pub mod steps;
pub mod testing;
pub mod tools;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::cancellation::CancellationToken;
    pub use crate::context::{Context, ContextSnapshot, ContextStore, StepContext};
    pub use crate::core::{
        Event, EventTag, HumanResponseEvent, InputRequiredEvent, RunStatus, StartEvent,
        StopEvent, TypedEvent,
    };
    pub use crate::errors::{
        ContextError, LlmError, ParseError, RetrievalError, RoutingError, StepError, ToolError,
        ValidationError, WorkflowError,
    };
    pub use crate::flows::{
        calculator_flow, calculator_start, echo_flow, greeting_flow, joke_flow, joke_start,
    };
    #[cfg(feature = "openai")]
    pub use crate::llm::OpenAiClient;
    pub use crate::llm::{ChatMessage, Conversation, LlmClient, LlmConfig, ScriptedLlm};
    pub use crate::observability::{init_tracing, LoggingObserver, NoOpObserver, Observer};
    pub use crate::react::{ReActAgent, ReActConfig, ReActResult};
    pub use crate::retrieval::{
        DirectoryReader, Document, Embedder, HashingEmbedder, QueryEngine, RetrievalSettings,
        VectorStoreIndex,
    };
    pub use crate::steps::{FnStep, Step, StepOutput};
    pub use crate::tools::{FunctionTool, Tool, ToolOutput, ToolRegistry};
    pub use crate::workflow::{FlowDiagram, RunHandle, Workflow, WorkflowConfig};
}
