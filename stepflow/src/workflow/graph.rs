//! A validated workflow and the entry points for running it.

use super::runner::Dispatcher;
use super::{event_channel, RunHandle, WorkflowBuilder, WorkflowConfig};
use crate::context::{Context, ContextSnapshot};
use crate::core::{Event, EventTag};
use crate::errors::{RoutingError, WorkflowError};
use crate::observability::Observer;
use crate::steps::Step;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug)]
struct Inner {
    name: String,
    steps: Vec<Arc<dyn Step>>,
    consumers: HashMap<EventTag, Arc<dyn Step>>,
    config: WorkflowConfig,
    observer: Arc<dyn Observer>,
}

/// A set of steps whose registrations have been validated.
///
/// Cloning is cheap; every run holds its own clone.
#[derive(Debug, Clone)]
pub struct Workflow {
    inner: Arc<Inner>,
}

impl Workflow {
    pub(crate) fn new(
        name: String,
        steps: Vec<Arc<dyn Step>>,
        consumers: HashMap<EventTag, Arc<dyn Step>>,
        config: WorkflowConfig,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                steps,
                consumers,
                config,
                observer,
            }),
        }
    }

    /// Starts building a workflow.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the steps in registration order.
    #[must_use]
    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.inner.steps
    }

    /// Returns the step that consumes `tag`.
    #[must_use]
    pub fn consumer_of(&self, tag: &str) -> Option<&Arc<dyn Step>> {
        self.inner.consumers.get(tag)
    }

    /// Returns the run configuration.
    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.inner.config
    }

    pub(crate) fn observer(&self) -> &Arc<dyn Observer> {
        &self.inner.observer
    }

    /// Ensures some step accepts the event.
    pub(crate) fn check_consumer(&self, event: &Event) -> Result<(), RoutingError> {
        if self.consumer_of(event.tag().as_str()).is_some() {
            Ok(())
        } else {
            Err(RoutingError::no_consumer(event.tag().clone()))
        }
    }

    /// Starts a run with the given initial event.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::NoConsumer`] without dispatching anything if
    /// no step accepts the initial event.
    pub fn run(&self, initial: Event) -> Result<RunHandle, WorkflowError> {
        self.run_with_context(Context::new(self.name()), Some(initial))
    }

    /// Starts a run over an existing context.
    ///
    /// Events already queued in the context are dispatched first. With no
    /// initial event and an empty queue the run idles until an event is sent
    /// through the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the context belongs to another workflow or no
    /// step accepts the initial event.
    pub fn run_with_context(
        &self,
        context: Context,
        initial: Option<Event>,
    ) -> Result<RunHandle, WorkflowError> {
        if context.workflow() != self.name() {
            return Err(crate::errors::ContextError::WorkflowMismatch {
                expected: self.name().to_string(),
                found: context.workflow().to_string(),
            }
            .into());
        }
        if let Some(ref event) = initial {
            self.check_consumer(event)?;
        }

        let context = Arc::new(context);
        if let Some(event) = initial {
            context.enqueue(event);
        }

        let (writer, stream) = event_channel();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(self.clone(), context.clone(), writer, inbox_rx);

        debug!(workflow = %self.name(), run_id = %context.run_id(), "Spawning workflow run");
        let join = tokio::spawn(dispatcher.run());

        Ok(RunHandle::new(self.clone(), context, inbox_tx, stream, join))
    }

    /// Starts a run restored from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot was taken from another workflow or no
    /// step accepts the initial event.
    pub fn run_from_snapshot(
        &self,
        snapshot: ContextSnapshot,
        initial: Option<Event>,
    ) -> Result<RunHandle, WorkflowError> {
        snapshot.check_workflow(self.name())?;
        self.run_with_context(Context::from_snapshot(snapshot), initial)
    }
}
