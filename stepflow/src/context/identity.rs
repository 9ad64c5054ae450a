//! Run identity for tracking workflow executions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this run.
    pub run_id: Uuid,

    /// The run this one was restored from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resumed_from: Option<Uuid>,

    /// When the run was created.
    pub created_at: DateTime<Utc>,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates a new run identity with a generated run ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            resumed_from: None,
            created_at: Utc::now(),
        }
    }

    /// Creates the identity of a run restored from `previous`.
    #[must_use]
    pub fn resumed(previous: Uuid) -> Self {
        Self {
            resumed_from: Some(previous),
            ..Self::new()
        }
    }

    /// Returns true if this run was restored from a snapshot.
    #[must_use]
    pub fn is_resumed(&self) -> bool {
        self.resumed_from.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity_is_unique() {
        let a = RunIdentity::new();
        let b = RunIdentity::new();
        assert_ne!(a.run_id, b.run_id);
        assert!(!a.is_resumed());
    }

    #[test]
    fn test_resumed_identity() {
        let original = RunIdentity::new();
        let resumed = RunIdentity::resumed(original.run_id);

        assert!(resumed.is_resumed());
        assert_eq!(resumed.resumed_from, Some(original.run_id));
        assert_ne!(resumed.run_id, original.run_id);
    }
}
