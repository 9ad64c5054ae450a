//! The dispatch loop of a single run.

use super::{EventWriter, Workflow};
use crate::context::{Context, ContextStore, StepContext};
use crate::core::{Event, RunStatus};
use crate::errors::{RoutingError, StepError, WorkflowError};
use crate::observability::{Signal, SignalKind, SpanTimer};
use crate::steps::{Step, StepOutput};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Drives one run from its pending queue to a terminal event.
pub(crate) struct Dispatcher {
    workflow: Workflow,
    context: Arc<Context>,
    writer: EventWriter,
    inbox: mpsc::UnboundedReceiver<Event>,
}

/// What routing one step's emissions decided.
enum Routed {
    Continue,
    Finished(serde_json::Value),
}

impl Dispatcher {
    pub(crate) fn new(
        workflow: Workflow,
        context: Arc<Context>,
        writer: EventWriter,
        inbox: mpsc::UnboundedReceiver<Event>,
    ) -> Self {
        Self {
            workflow,
            context,
            writer,
            inbox,
        }
    }

    /// Runs to completion and returns the `result` of the terminal event.
    pub(crate) async fn run(mut self) -> Result<serde_json::Value, WorkflowError> {
        let span = info_span!(
            "workflow.run",
            workflow = %self.workflow.name(),
            run_id = %self.context.run_id(),
        );

        async move {
            if !self.context.is_waiting_for_input() {
                self.context.set_status(RunStatus::Running);
            }
            self.signal(Signal::new(
                SignalKind::RunStarted,
                self.workflow.name(),
                self.context.run_id(),
            ));
            info!(
                resumed_from = ?self.context.identity().resumed_from,
                pending = self.context.pending_len(),
                "Run started"
            );

            let outcome = match self.workflow.config().timeout() {
                Some(limit) => match tokio::time::timeout(limit, self.dispatch_loop()).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        self.context.cancellation().cancel("timeout");
                        Err(WorkflowError::Timeout {
                            seconds: limit.as_secs_f64(),
                        })
                    }
                },
                None => self.dispatch_loop().await,
            };

            self.finish(&outcome);
            outcome
        }
        .instrument(span)
        .await
    }

    async fn dispatch_loop(&mut self) -> Result<serde_json::Value, WorkflowError> {
        loop {
            if let Some(reason) = self.cancel_reason() {
                return Err(WorkflowError::cancelled(reason));
            }

            while let Ok(event) = self.inbox.try_recv() {
                self.accept(event);
            }

            let Some((event, staged)) = self.context.begin_dispatch() else {
                self.idle().await?;
                continue;
            };

            if let Routed::Finished(result) = self.dispatch(event, staged).await? {
                return Ok(result);
            }
        }
    }

    /// Waits for an injected event or cancellation.
    async fn idle(&mut self) -> Result<(), WorkflowError> {
        debug!(
            waiting_for_input = self.context.is_waiting_for_input(),
            "Run idle"
        );
        let cancellation = self.context.cancellation().clone();
        tokio::select! {
            biased;
            () = cancellation.cancelled() => Ok(()),
            received = self.inbox.recv() => match received {
                Some(event) => {
                    self.accept(event);
                    Ok(())
                }
                None => Err(WorkflowError::cancelled(
                    "run handle dropped while the run was idle",
                )),
            },
        }
    }

    fn accept(&self, event: Event) {
        debug!(tag = %event.tag(), "Event injected");
        self.context.enqueue(event);
    }

    async fn dispatch(
        &self,
        event: Event,
        staged: ContextStore,
    ) -> Result<Routed, WorkflowError> {
        let Some(step) = self.workflow.consumer_of(event.tag().as_str()).cloned() else {
            self.context.abort_dispatch();
            return Err(RoutingError::no_consumer(event.tag().clone()).into());
        };

        let store = Arc::new(staged);
        let step_ctx = StepContext::new(
            self.workflow.name(),
            self.context.run_id(),
            step.name(),
            store.clone(),
            self.writer.clone(),
            self.context.cancellation().clone(),
        );

        self.signal(self.step_signal(SignalKind::StepStarted, step.as_ref(), &event));
        let timer = SpanTimer::start(step.name());
        let span = info_span!("workflow.step", step = %step.name(), tag = %event.tag());
        let result = step.run(event.clone(), &step_ctx).instrument(span).await;
        let duration_ms = timer.finish();
        drop(step_ctx);

        let output = match result {
            Ok(output) => output,
            Err(cause) => {
                self.context.abort_dispatch();
                let err = StepError::new(step.name(), event.tag().clone(), cause);
                warn!(step = %step.name(), error = %err, "Step failed");
                self.signal(
                    self.step_signal(SignalKind::StepFailed, step.as_ref(), &event)
                        .with_duration_ms(duration_ms)
                        .with_error(err.to_string()),
                );
                return Err(err.into());
            }
        };

        self.signal(
            self.step_signal(SignalKind::StepCompleted, step.as_ref(), &event)
                .with_duration_ms(duration_ms),
        );

        let staged = Arc::try_unwrap(store).unwrap_or_else(|shared| (*shared).clone());
        self.route(step.as_ref(), output, staged)
    }

    /// Commits the step's writes and routes its emissions in order.
    fn route(
        &self,
        step: &dyn Step,
        output: StepOutput,
        staged: ContextStore,
    ) -> Result<Routed, WorkflowError> {
        let events = output.into_events();
        let routable = match self.check_emissions(step, &events) {
            Ok(count) => count,
            Err(err) => {
                self.context.abort_dispatch();
                return Err(err.into());
            }
        };
        if routable < events.len() {
            debug!(
                step = %step.name(),
                dropped = events.len() - routable,
                "Emissions after the terminal event ignored"
            );
        }

        let mut signals = Vec::new();
        let routed = self.context.with_state(|state| {
            state.commit(staged);
            for event in events.into_iter().take(routable) {
                self.writer.write(event.clone());

                if event.tag().is_terminal() {
                    state.status = RunStatus::Completed;
                    state.waiting_for = None;
                    let result = event.get("result").cloned().unwrap_or_default();
                    return Routed::Finished(result);
                }

                if event.tag().is_input_required() {
                    signals.push(
                        self.run_signal(SignalKind::InputRequired)
                            .with_step(step.name()),
                    );
                    state.waiting_for = Some(event);
                    state.status = RunStatus::WaitingForInput;
                    continue;
                }

                signals.push(
                    self.run_signal(SignalKind::EventRouted)
                        .with_step(step.name())
                        .with_tag(event.tag().clone()),
                );
                state.pending.push_back(event);
            }
            Routed::Continue
        });

        for signal in &signals {
            self.signal(signal.clone());
        }
        Ok(routed)
    }

    /// Returns how many leading emissions should be routed.
    fn check_emissions(&self, step: &dyn Step, events: &[Event]) -> Result<usize, RoutingError> {
        let declared = step.emits();
        let strict = self.workflow.config().strict_emissions;

        for (index, event) in events.iter().enumerate() {
            let tag = event.tag();
            if strict && !declared.contains(tag) {
                return Err(RoutingError::UndeclaredEmission {
                    step: step.name().to_string(),
                    tag: tag.clone(),
                });
            }
            if tag.is_terminal() {
                return Ok(index + 1);
            }
            if !tag.is_input_required() {
                self.workflow.check_consumer(event)?;
            }
        }
        Ok(events.len())
    }

    fn cancel_reason(&self) -> Option<String> {
        let token = self.context.cancellation();
        if token.is_cancelled() {
            Some(token.reason().unwrap_or_else(|| "cancelled".to_string()))
        } else {
            None
        }
    }

    fn finish(&self, outcome: &Result<serde_json::Value, WorkflowError>) {
        let (status, signal) = match outcome {
            Ok(_) => {
                info!(dispatches = self.context.dispatch_count(), "Run completed");
                (RunStatus::Completed, self.run_signal(SignalKind::RunCompleted))
            }
            Err(err @ (WorkflowError::Cancelled { .. } | WorkflowError::Timeout { .. })) => {
                info!(reason = %err, "Run cancelled");
                (
                    RunStatus::Cancelled,
                    self.run_signal(SignalKind::RunCancelled).with_error(err.to_string()),
                )
            }
            Err(err) => {
                warn!(error = %err, "Run failed");
                (
                    RunStatus::Failed,
                    self.run_signal(SignalKind::RunFailed).with_error(err.to_string()),
                )
            }
        };
        self.context.set_status(status);
        self.signal(signal);
    }

    fn run_signal(&self, kind: SignalKind) -> Signal {
        Signal::new(kind, self.workflow.name(), self.context.run_id())
    }

    fn step_signal(&self, kind: SignalKind, step: &dyn Step, event: &Event) -> Signal {
        self.run_signal(kind)
            .with_step(step.name())
            .with_tag(event.tag().clone())
    }

    fn signal(&self, signal: Signal) {
        self.workflow.observer().on_signal(&signal);
    }
}
