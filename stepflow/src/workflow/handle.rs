//! Caller-side handle of a running workflow.

use super::{EventStream, Workflow};
use crate::context::{Context, ContextSnapshot};
use crate::core::{Event, RunStatus};
use crate::errors::WorkflowError;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Handle to a spawned run.
///
/// Await the handle for the run result. Before that, the handle can stream
/// published events, inject events and externalize the context:
///
/// ```rust,ignore
/// let handle = workflow.run(StartEvent::new().into_event())?;
/// let mut events = handle.stream_events()?;
/// while let Some(event) = events.next().await {
///     if event.is("input_required") {
///         handle.send_event(HumanResponseEvent::new("42").into_event()?)?;
///     }
/// }
/// let result = handle.await?;
/// ```
///
/// Awaiting consumes the handle, after which no events can be injected: a
/// run that goes idle at that point ends as cancelled.
pub struct RunHandle {
    workflow: Workflow,
    context: Arc<Context>,
    inbox: mpsc::UnboundedSender<Event>,
    stream: Mutex<Option<EventStream>>,
    join: JoinHandle<Result<serde_json::Value, WorkflowError>>,
}

impl RunHandle {
    pub(crate) fn new(
        workflow: Workflow,
        context: Arc<Context>,
        inbox: mpsc::UnboundedSender<Event>,
        stream: EventStream,
        join: JoinHandle<Result<serde_json::Value, WorkflowError>>,
    ) -> Self {
        Self {
            workflow,
            context,
            inbox,
            stream: Mutex::new(Some(stream)),
            join,
        }
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.context.run_id()
    }

    /// Returns the run context.
    #[must_use]
    pub fn context(&self) -> Arc<Context> {
        self.context.clone()
    }

    /// Externalizes the run state at the latest dispatch boundary.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        self.context.snapshot()
    }

    /// Returns the run status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.context.status()
    }

    /// Returns true once the run task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Takes the stream of published events.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::StreamConsumed`] on every call after the first.
    pub fn stream_events(&self) -> Result<EventStream, WorkflowError> {
        self.stream.lock().take().ok_or(WorkflowError::StreamConsumed)
    }

    /// Injects an event into the run.
    ///
    /// # Errors
    ///
    /// Returns a routing error if no step accepts the event, or
    /// [`WorkflowError::RunFinished`] if the run has already ended.
    pub fn send_event(&self, event: Event) -> Result<(), WorkflowError> {
        self.workflow.check_consumer(&event)?;
        self.inbox
            .send(event)
            .map_err(|_| WorkflowError::RunFinished)
    }

    /// Requests cancellation. The run stops at the next dispatch boundary.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.context.cancellation().cancel(reason);
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("workflow", &self.workflow.name())
            .field("run_id", &self.run_id())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl IntoFuture for RunHandle {
    type Output = Result<serde_json::Value, WorkflowError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { inbox, join, .. } = self;
        drop(inbox);
        async move {
            match join.await {
                Ok(outcome) => outcome,
                Err(err) => Err(WorkflowError::Internal(format!("run task failed: {err}"))),
            }
        }
        .boxed()
    }
}
