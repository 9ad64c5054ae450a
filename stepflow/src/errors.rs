//! Error types for the stepflow framework.
//!
//! Registration problems surface as [`ValidationError`] when a workflow is
//! built. Everything that can go wrong while a run is in flight is folded into
//! [`WorkflowError`], which is what awaiting a [`RunHandle`] yields.
//!
//! [`RunHandle`]: crate::workflow::RunHandle

use crate::core::EventTag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The main error type for a workflow run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The workflow registration is invalid.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A message could not be routed to a step.
    #[error("{0}")]
    Routing(#[from] RoutingError),

    /// A step failed while handling a message.
    #[error("{0}")]
    Step(#[from] StepError),

    /// The context store could not be read, written or restored.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// The run was cancelled before it produced a terminal message.
    #[error("Run cancelled: {reason}")]
    Cancelled {
        /// Why the run was cancelled.
        reason: String,
    },

    /// The run did not finish within the configured timeout.
    #[error("Run timed out after {seconds}s")]
    Timeout {
        /// The configured timeout in seconds.
        seconds: f64,
    },

    /// The event stream of a run was requested twice.
    #[error("Event stream already consumed for this run")]
    StreamConsumed,

    /// An event was sent to a run that has already ended.
    #[error("Run already finished")]
    RunFinished,

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Returns the routing error, if this is one.
    #[must_use]
    pub fn as_routing(&self) -> Option<&RoutingError> {
        match self {
            Self::Routing(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the step error, if this is one.
    #[must_use]
    pub fn as_step(&self) -> Option<&StepError> {
        match self {
            Self::Step(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Metadata about a registration error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "WORKFLOW-DUPLICATE_CONSUMER").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a workflow registration is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The error message.
    pub message: String,
    /// The steps involved in the error.
    pub steps: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ErrorInfo>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            steps: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the steps involved.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when a message cannot be delivered to a step.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// No registered step accepts the message tag.
    #[error("No step accepts events tagged '{tag}'")]
    NoConsumer {
        /// The undeliverable tag.
        tag: EventTag,
    },

    /// A step emitted a tag it did not declare at registration.
    #[error("Step '{step}' emitted undeclared event '{tag}'")]
    UndeclaredEmission {
        /// The emitting step.
        step: String,
        /// The undeclared tag.
        tag: EventTag,
    },
}

impl RoutingError {
    /// Creates a no-consumer error.
    #[must_use]
    pub fn no_consumer(tag: EventTag) -> Self {
        Self::NoConsumer { tag }
    }

    /// Returns the tag that could not be routed.
    #[must_use]
    pub fn tag(&self) -> &EventTag {
        match self {
            Self::NoConsumer { tag } | Self::UndeclaredEmission { tag, .. } => tag,
        }
    }
}

/// Error raised when a step fails while handling a message.
///
/// The original cause is preserved and can be downcast through
/// [`StepError::cause`].
#[derive(Debug)]
pub struct StepError {
    /// Step that failed.
    pub step: String,
    /// Tag of the message the step was handling.
    pub event_tag: EventTag,
    cause: anyhow::Error,
}

impl StepError {
    /// Creates a new step error.
    #[must_use]
    pub fn new(step: impl Into<String>, event_tag: EventTag, cause: anyhow::Error) -> Self {
        Self {
            step: step.into(),
            event_tag,
            cause,
        }
    }

    /// Returns the original cause.
    #[must_use]
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Step {} failed on '{}': {}",
            self.step, self.event_tag, self.cause
        )
    }
}

impl std::error::Error for StepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let source: &(dyn std::error::Error + 'static) = self.cause.as_ref();
        Some(source)
    }
}

/// Error raised when structured output does not have the expected shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Parse error: {message}")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// The raw text that failed to parse.
    pub raw: Option<String>,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            raw: None,
        }
    }

    /// Attaches the raw input.
    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Errors related to the context store and its snapshots.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A stored value could not be converted to or from JSON.
    #[error("Serialization error for key '{key}': {source}")]
    Serialization {
        /// The store key.
        key: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A required key was not present.
    #[error("Missing context key: {0}")]
    MissingKey(String),

    /// A snapshot could not be encoded or decoded.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A snapshot belongs to a different workflow.
    #[error("Snapshot was taken from workflow '{found}', expected '{expected}'")]
    WorkflowMismatch {
        /// The workflow being resumed.
        expected: String,
        /// The workflow recorded in the snapshot.
        found: String,
    },

    /// A snapshot was written with an unsupported format version.
    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// Errors related to tool execution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    /// Tool was not found in the registry.
    #[error("Tool {name} does not exist")]
    NotFound {
        /// The tool name.
        name: String,
    },

    /// A keyword argument was missing or had the wrong type.
    #[error("Invalid argument '{argument}' for tool {name}: {reason}")]
    InvalidArgument {
        /// The tool name.
        name: String,
        /// The argument name.
        argument: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Tool execution failed.
    #[error("Error calling tool {name}: {reason}")]
    ExecutionFailed {
        /// The tool name.
        name: String,
        /// The reason for failure.
        reason: String,
    },
}

impl ToolError {
    /// Creates a tool not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(
        name: impl Into<String>,
        argument: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Creates an execution failed error.
    #[must_use]
    pub fn execution_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by language-model clients.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The client is misconfigured (e.g. no API key).
    #[error("LLM configuration error: {0}")]
    Config(String),

    /// The request could not be sent or the connection failed.
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("LLM provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The provider response could not be decoded.
    #[error("LLM response could not be decoded: {0}")]
    Decode(String),

    /// A scripted client ran out of responses.
    #[error("No scripted response left for request #{0}")]
    Exhausted(usize),
}

impl LlmError {
    /// Returns true if retrying the request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

/// Errors raised by the retrieval components.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Embedding the text failed.
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Embedding dimensions do not agree.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the index.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// Synthesizing an answer failed.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Splitter or index settings are inconsistent.
    #[error("Invalid retrieval settings: {0}")]
    InvalidSettings(String),

    /// IO error while loading documents.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_creation() {
        let info = ErrorInfo::new("TEST-001", "Test error")
            .with_fix_hint("Fix this by doing that")
            .with_context_entry("step", "my_step");

        assert_eq!(info.code, "TEST-001");
        assert_eq!(info.fix_hint, Some("Fix this by doing that".to_string()));
        assert_eq!(info.context.get("step"), Some(&"my_step".to_string()));
    }

    #[test]
    fn test_validation_error_code() {
        let err = ValidationError::new("bad")
            .with_steps(vec!["a".to_string()])
            .with_error_info(ErrorInfo::new("WORKFLOW-EMPTY", "empty"));

        assert_eq!(err.code(), Some("WORKFLOW-EMPTY"));
        assert_eq!(err.to_string(), "bad");
    }

    #[test]
    fn test_step_error_preserves_cause() {
        let cause = anyhow::Error::new(ParseError::new("missing NUMBER1"));
        let err = StepError::new("extract", EventTag::new("parse"), cause);

        assert!(err.to_string().contains("extract"));
        assert!(err.cause().downcast_ref::<ParseError>().is_some());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_routing_error_tag() {
        let err = RoutingError::no_consumer(EventTag::new("orphan"));
        assert_eq!(err.tag().as_str(), "orphan");
        assert!(err.to_string().contains("orphan"));
    }

    #[test]
    fn test_llm_error_retryable() {
        assert!(LlmError::Transport("reset".into()).is_retryable());
        assert!(LlmError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!LlmError::Status { status: 401, body: String::new() }.is_retryable());
        assert!(!LlmError::Exhausted(3).is_retryable());
    }

    #[test]
    fn test_workflow_error_accessors() {
        let err = WorkflowError::from(RoutingError::no_consumer(EventTag::new("x")));
        assert!(err.as_routing().is_some());
        assert!(err.as_step().is_none());
        assert!(WorkflowError::cancelled("user").is_cancelled());
    }
}
