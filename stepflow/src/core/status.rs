//! Run status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run was created but has not dispatched anything yet.
    #[default]
    Pending,
    /// The run is dispatching events.
    Running,
    /// The run is idle, waiting for a human reply.
    WaitingForInput,
    /// The run produced a terminal event.
    Completed,
    /// A step or routing error aborted the run.
    Failed,
    /// The run was cancelled.
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::WaitingForInput => write!(f, "waiting_for_input"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl RunStatus {
    /// Returns true if the status represents a finished run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::WaitingForInput.to_string(), "waiting_for_input");
        assert_eq!(RunStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn test_run_status_is_terminal() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(!RunStatus::WaitingForInput.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
    }

    #[test]
    fn test_run_status_serialize() {
        let json = serde_json::to_string(&RunStatus::WaitingForInput).unwrap();
        assert_eq!(json, r#""waiting_for_input""#);
    }
}
