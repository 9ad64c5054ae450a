//! Run context management.
//!
//! This module provides:
//! - The Context Store shared by the steps of a run
//! - The run-level [`Context`] and the step-level [`StepContext`]
//! - Serializable snapshots for suspending and resuming runs

mod execution;
mod identity;
mod snapshot;
mod store;

pub(crate) use execution::RunState;
pub use execution::{Context, StepContext};
pub use identity::RunIdentity;
pub use snapshot::{ContextSnapshot, SNAPSHOT_VERSION};
pub use store::ContextStore;
