//! Externalized run state for suspension and resumption.

use crate::core::{Event, RunStatus};
use crate::errors::ContextError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A serializable copy of a run's context, taken at a dispatch boundary.
///
/// Restoring a snapshot into a fresh run brings back the store, the queue of
/// events still waiting for dispatch, and the pending human-input request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Format version.
    pub version: u32,
    /// Name of the workflow the run belonged to.
    pub workflow: String,
    /// ID of the run the snapshot was taken from.
    pub run_id: Uuid,
    /// Store contents.
    #[serde(default)]
    pub store: BTreeMap<String, serde_json::Value>,
    /// Events emitted but not yet dispatched, in dispatch order.
    #[serde(default)]
    pub pending: Vec<Event>,
    /// The outstanding `input_required` event, if the run was suspended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_for: Option<Event>,
    /// Number of step invocations performed so far.
    #[serde(default)]
    pub dispatch_count: u64,
    /// Run status when the snapshot was taken.
    #[serde(default)]
    pub status: RunStatus,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

impl ContextSnapshot {
    /// Creates an empty snapshot for a workflow.
    #[must_use]
    pub fn empty(workflow: impl Into<String>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            workflow: workflow.into(),
            run_id: Uuid::new_v4(),
            store: BTreeMap::new(),
            pending: Vec::new(),
            waiting_for: None,
            dispatch_count: 0,
            status: RunStatus::Pending,
            taken_at: Utc::now(),
        }
    }

    /// Returns true if the run was waiting for human input.
    #[must_use]
    pub fn is_waiting_for_input(&self) -> bool {
        self.waiting_for.is_some()
    }

    /// Encodes the snapshot as compact JSON.
    pub fn to_json(&self) -> Result<String, ContextError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encodes the snapshot as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, ContextError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes a snapshot, rejecting unknown format versions.
    pub fn from_json(json: &str) -> Result<Self, ContextError> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ContextError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    /// Ensures the snapshot was taken from the named workflow.
    pub fn check_workflow(&self, expected: &str) -> Result<(), ContextError> {
        if self.workflow == expected {
            Ok(())
        } else {
            Err(ContextError::WorkflowMismatch {
                expected: expected.to_string(),
                found: self.workflow.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InputRequiredEvent, TypedEvent};

    #[test]
    fn test_snapshot_json_round_trip_keeps_queue_and_waiting() {
        let mut snapshot = ContextSnapshot::empty("human");
        snapshot.store.insert("name".into(), serde_json::json!("Ada"));
        snapshot.pending.push(Event::new("prep"));
        snapshot.waiting_for = Some(InputRequiredEvent::new("Name? ").into_event().unwrap());
        snapshot.status = RunStatus::WaitingForInput;

        let json = snapshot.to_json().unwrap();
        let restored = ContextSnapshot::from_json(&json).unwrap();

        assert_eq!(restored, snapshot);
        assert!(restored.is_waiting_for_input());
    }

    #[test]
    fn test_snapshot_rejects_unknown_version() {
        let mut snapshot = ContextSnapshot::empty("w");
        snapshot.version = 99;
        let json = serde_json::to_string(&snapshot).unwrap();

        assert!(matches!(
            ContextSnapshot::from_json(&json),
            Err(ContextError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_snapshot_workflow_check() {
        let snapshot = ContextSnapshot::empty("joke");
        assert!(snapshot.check_workflow("joke").is_ok());
        assert!(matches!(
            snapshot.check_workflow("calculator"),
            Err(ContextError::WorkflowMismatch { .. })
        ));
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(matches!(
            ContextSnapshot::from_json("{not json"),
            Err(ContextError::Snapshot(_))
        ));
    }
}
