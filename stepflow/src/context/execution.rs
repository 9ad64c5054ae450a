//! Run-level and step-level execution contexts.

use super::{ContextSnapshot, ContextStore, RunIdentity, SNAPSHOT_VERSION};
use crate::cancellation::CancellationToken;
use crate::core::{Event, RunStatus};
use crate::errors::ContextError;
use crate::workflow::EventWriter;
use chrono::Utc;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

/// Mutable state of a run. Guarded by a single lock so that readers always
/// observe a dispatch boundary.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub(crate) store: ContextStore,
    pub(crate) pending: VecDeque<Event>,
    pub(crate) in_flight: Option<Event>,
    pub(crate) waiting_for: Option<Event>,
    pub(crate) dispatch_count: u64,
    pub(crate) status: RunStatus,
}

/// The context of one workflow run.
///
/// Owns the Context Store, the queue of events waiting for dispatch and the
/// outstanding human-input request. A `Context` can be created up front and
/// seeded before the run starts, or rebuilt from a [`ContextSnapshot`].
pub struct Context {
    workflow: String,
    identity: RunIdentity,
    state: Mutex<RunState>,
    cancellation: Arc<CancellationToken>,
}

impl Context {
    /// Creates an empty context for the named workflow.
    #[must_use]
    pub fn new(workflow: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            identity: RunIdentity::new(),
            state: Mutex::new(RunState::default()),
            cancellation: Arc::new(CancellationToken::new()),
        }
    }

    /// Restores a context from a snapshot into a fresh run identity.
    #[must_use]
    pub fn from_snapshot(snapshot: ContextSnapshot) -> Self {
        let status = if snapshot.waiting_for.is_some() {
            RunStatus::WaitingForInput
        } else {
            RunStatus::Pending
        };
        Self {
            identity: RunIdentity::resumed(snapshot.run_id),
            workflow: snapshot.workflow,
            state: Mutex::new(RunState {
                store: ContextStore::from_map(snapshot.store),
                pending: snapshot.pending.into(),
                in_flight: None,
                waiting_for: snapshot.waiting_for,
                dispatch_count: snapshot.dispatch_count,
                status,
            }),
            cancellation: Arc::new(CancellationToken::new()),
        }
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.identity.run_id
    }

    /// Returns the cancellation token of the run.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancellation
    }

    /// Reads a typed value from the committed store.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContextError> {
        self.state.lock().store.get(key)
    }

    /// Writes a typed value into the store. Intended for seeding a run.
    pub fn set<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T) -> Result<(), ContextError> {
        self.state.lock().store.set(key, value)
    }

    /// Returns a copy of the committed store.
    #[must_use]
    pub fn store(&self) -> BTreeMap<String, serde_json::Value> {
        self.state.lock().store.to_map()
    }

    /// Returns the run status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.state.lock().status
    }

    /// Returns the number of step invocations that completed so far.
    #[must_use]
    pub fn dispatch_count(&self) -> u64 {
        self.state.lock().dispatch_count
    }

    /// Returns true if the run is suspended on an `input_required` event.
    #[must_use]
    pub fn is_waiting_for_input(&self) -> bool {
        self.state.lock().waiting_for.is_some()
    }

    /// Returns the outstanding `input_required` event, if any.
    #[must_use]
    pub fn waiting_for(&self) -> Option<Event> {
        self.state.lock().waiting_for.clone()
    }

    /// Returns the number of events waiting for dispatch.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        let state = self.state.lock();
        state.pending.len() + usize::from(state.in_flight.is_some())
    }

    /// Externalizes the run state.
    ///
    /// An event whose step is still executing is recorded at the head of the
    /// pending queue, so restoring replays that step from its start.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        let state = self.state.lock();
        let pending = state
            .in_flight
            .iter()
            .chain(state.pending.iter())
            .cloned()
            .collect();
        ContextSnapshot {
            version: SNAPSHOT_VERSION,
            workflow: self.workflow.clone(),
            run_id: self.identity.run_id,
            store: state.store.to_map(),
            pending,
            waiting_for: state.waiting_for.clone(),
            dispatch_count: state.dispatch_count,
            status: state.status,
            taken_at: Utc::now(),
        }
    }

    /// Runs `f` with exclusive access to the run state.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut RunState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Queues an event for dispatch. Any event clears a pending input request.
    pub(crate) fn enqueue(&self, event: Event) {
        let mut state = self.state.lock();
        if state.waiting_for.take().is_some() && !state.status.is_terminal() {
            state.status = RunStatus::Running;
        }
        state.pending.push_back(event);
    }

    /// Takes the next event and returns it with a staged copy of the store.
    pub(crate) fn begin_dispatch(&self) -> Option<(Event, ContextStore)> {
        let mut state = self.state.lock();
        let event = state.pending.pop_front()?;
        state.in_flight = Some(event.clone());
        Some((event, state.store.clone()))
    }

    /// Clears the in-flight event without committing its writes.
    pub(crate) fn abort_dispatch(&self) {
        self.state.lock().in_flight = None;
    }

    pub(crate) fn set_status(&self, status: RunStatus) {
        self.state.lock().status = status;
    }
}

impl RunState {
    /// Replaces the committed store with a step's staged writes.
    pub(crate) fn commit(&mut self, staged: ContextStore) {
        self.store = staged;
        self.in_flight = None;
        self.dispatch_count += 1;
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Context")
            .field("workflow", &self.workflow)
            .field("run_id", &self.identity.run_id)
            .field("status", &state.status)
            .field("pending", &state.pending.len())
            .field("dispatch_count", &state.dispatch_count)
            .finish_non_exhaustive()
    }
}

/// The view a step gets of its run.
///
/// Store access goes to a staged copy: writes become visible to the run only
/// if the step returns successfully. Clones share the same staged store.
#[derive(Debug, Clone)]
pub struct StepContext {
    workflow: String,
    run_id: Uuid,
    step_name: String,
    store: Arc<ContextStore>,
    writer: EventWriter,
    cancellation: Arc<CancellationToken>,
}

impl StepContext {
    /// Creates a step context.
    #[must_use]
    pub fn new(
        workflow: impl Into<String>,
        run_id: Uuid,
        step_name: impl Into<String>,
        store: Arc<ContextStore>,
        writer: EventWriter,
        cancellation: Arc<CancellationToken>,
    ) -> Self {
        Self {
            workflow: workflow.into(),
            run_id,
            step_name: step_name.into(),
            store,
            writer,
            cancellation,
        }
    }

    /// Creates a context that is not attached to any run. Stream writes are
    /// dropped.
    #[must_use]
    pub fn detached(step_name: impl Into<String>) -> Self {
        Self::new(
            "detached",
            Uuid::new_v4(),
            step_name,
            Arc::new(ContextStore::new()),
            EventWriter::disconnected(),
            Arc::new(CancellationToken::new()),
        )
    }

    /// Replaces the store, e.g. to pre-seed a detached context.
    #[must_use]
    pub fn with_store(mut self, store: ContextStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Replaces the stream writer.
    #[must_use]
    pub fn with_writer(mut self, writer: EventWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Returns the Context Store of the run.
    #[must_use]
    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Returns the name of the executing step.
    #[must_use]
    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Publishes an event on the run's stream without routing it.
    ///
    /// Used for progress output such as token deltas. Does nothing once the
    /// stream consumer has gone away.
    pub fn write_event_to_stream(&self, event: Event) {
        self.writer.write(event);
    }

    /// Returns true if the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns the cancellation token of the run.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancellation
    }
}
