//! Run observers.
//!
//! An [`Observer`] is handed to a workflow at construction and receives a
//! [`Signal`] at each lifecycle point of every run.

use crate::core::EventTag;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::Level;
use uuid::Uuid;

/// The lifecycle point a signal reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// A run started or resumed.
    RunStarted,
    /// A step began handling an event.
    StepStarted,
    /// A step returned successfully.
    StepCompleted,
    /// A step returned an error.
    StepFailed,
    /// An emitted event was queued for dispatch.
    EventRouted,
    /// A run suspended on an `input_required` event.
    InputRequired,
    /// A run produced its terminal event.
    RunCompleted,
    /// A run aborted on an error.
    RunFailed,
    /// A run was cancelled or timed out.
    RunCancelled,
}

impl SignalKind {
    /// Returns the dotted name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunStarted => "run.started",
            Self::StepStarted => "step.started",
            Self::StepCompleted => "step.completed",
            Self::StepFailed => "step.failed",
            Self::EventRouted => "event.routed",
            Self::InputRequired => "run.input_required",
            Self::RunCompleted => "run.completed",
            Self::RunFailed => "run.failed",
            Self::RunCancelled => "run.cancelled",
        }
    }
}

/// One observation about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// What happened.
    pub kind: SignalKind,
    /// Workflow name.
    pub workflow: String,
    /// Run ID.
    pub run_id: Uuid,
    /// Step involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    /// Event tag involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<EventTag>,
    /// Duration in milliseconds, for completions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Error message, for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the signal was produced.
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// Creates a signal.
    #[must_use]
    pub fn new(kind: SignalKind, workflow: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            kind,
            workflow: workflow.into(),
            run_id,
            step: None,
            tag: None,
            duration_ms: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Sets the step.
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Sets the event tag.
    #[must_use]
    pub fn with_tag(mut self, tag: EventTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Receives run signals. Implementations must not block.
pub trait Observer: Send + Sync + Debug {
    /// Handles one signal.
    fn on_signal(&self, signal: &Signal);
}

/// Discards all signals. The default observer of a workflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl Observer for NoOpObserver {
    fn on_signal(&self, _signal: &Signal) {}
}

/// Writes signals through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    level: Level,
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingObserver {
    /// Creates a logging observer for the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level observer.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl Observer for LoggingObserver {
    fn on_signal(&self, signal: &Signal) {
        let step = signal.step.as_deref().unwrap_or("");
        let tag = signal.tag.as_ref().map(EventTag::as_str).unwrap_or("");
        let kind = signal.kind.as_str();

        if let Some(ref error) = signal.error {
            tracing::error!(
                signal = kind,
                workflow = %signal.workflow,
                run_id = %signal.run_id,
                step,
                tag,
                error = %error,
                "Signal: {}", kind
            );
            return;
        }

        if self.level == Level::DEBUG {
            tracing::debug!(
                signal = kind,
                workflow = %signal.workflow,
                run_id = %signal.run_id,
                step,
                tag,
                duration_ms = ?signal.duration_ms,
                "Signal: {}", kind
            );
        } else {
            tracing::info!(
                signal = kind,
                workflow = %signal.workflow,
                run_id = %signal.run_id,
                step,
                tag,
                duration_ms = ?signal.duration_ms,
                "Signal: {}", kind
            );
        }
    }
}

/// Keeps every signal in memory. Meant for tests.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    signals: RwLock<Vec<Signal>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected signals.
    #[must_use]
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.read().clone()
    }

    /// Returns the kinds of all collected signals, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<SignalKind> {
        self.signals.read().iter().map(|s| s.kind).collect()
    }

    /// Returns the number of signals of one kind.
    #[must_use]
    pub fn count(&self, kind: SignalKind) -> usize {
        self.signals.read().iter().filter(|s| s.kind == kind).count()
    }

    /// Returns the number of collected signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.read().is_empty()
    }

    /// Clears all signals.
    pub fn clear(&self) {
        self.signals.write().clear();
    }
}

impl Observer for CollectingObserver {
    fn on_signal(&self, signal: &Signal) {
        self.signals.write().push(signal.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(kind: SignalKind) -> Signal {
        Signal::new(kind, "joke", Uuid::new_v4())
    }

    #[test]
    fn test_collecting_observer() {
        let observer = CollectingObserver::new();
        observer.on_signal(&signal(SignalKind::RunStarted));
        observer.on_signal(&signal(SignalKind::StepStarted).with_step("generate_joke"));
        observer.on_signal(&signal(SignalKind::StepStarted).with_step("critique_joke"));

        assert_eq!(observer.len(), 3);
        assert_eq!(observer.count(SignalKind::StepStarted), 2);
        assert_eq!(observer.signals()[1].step.as_deref(), Some("generate_joke"));

        observer.clear();
        assert!(observer.is_empty());
    }

    #[test]
    fn test_logging_observer_does_not_panic() {
        let observer = LoggingObserver::debug();
        observer.on_signal(&signal(SignalKind::StepCompleted).with_duration_ms(1.5));
        observer.on_signal(&signal(SignalKind::StepFailed).with_error("boom"));
        NoOpObserver.on_signal(&signal(SignalKind::RunCompleted));
    }

    #[test]
    fn test_signal_serialization_skips_empty_fields() {
        let json = serde_json::to_value(signal(SignalKind::EventRouted).with_tag(EventTag::new("joke")))
            .unwrap();
        assert_eq!(json["kind"], "event_routed");
        assert_eq!(json["tag"], "joke");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_signal_kind_names() {
        assert_eq!(SignalKind::InputRequired.as_str(), "run.input_required");
        assert_eq!(SignalKind::StepFailed.as_str(), "step.failed");
    }
}
