//! Workflow run configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_timeout_seconds() -> Option<f64> {
    Some(60.0)
}

fn default_strict_emissions() -> bool {
    true
}

/// Settings applied to every run of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Wall-clock limit for a run, in seconds. `None` disables the limit.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: Option<f64>,

    /// Reject emissions a step did not declare at registration.
    #[serde(default = "default_strict_emissions")]
    pub strict_emissions: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            strict_emissions: default_strict_emissions(),
        }
    }
}

impl WorkflowConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the run timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_seconds = Some(timeout.as_secs_f64());
        self
    }

    /// Disables the run timeout.
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.timeout_seconds = None;
        self
    }

    /// Sets whether undeclared emissions are routing errors.
    #[must_use]
    pub fn with_strict_emissions(mut self, strict: bool) -> Self {
        self.strict_emissions = strict;
        self
    }

    /// Returns the timeout as a duration. Values too large for a
    /// [`Duration`] mean no limit.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}
