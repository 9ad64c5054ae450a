//! Events the runner understands natively.

use super::{Event, EventTag, TypedEvent};
use serde::{Deserialize, Serialize};

/// The event that begins a run. Carries arbitrary caller-supplied fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartEvent {
    /// Caller-supplied input fields.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StartEvent {
    /// Creates an empty start event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Converts into an untyped event.
    #[must_use]
    pub fn into_event(self) -> Event {
        Event::with_fields(EventTag::START, self.fields)
    }
}

impl TypedEvent for StartEvent {
    const TAG: &'static str = EventTag::START;
}

/// The terminal event. Its `result` is what awaiting a run returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopEvent {
    /// The run result.
    #[serde(default)]
    pub result: serde_json::Value,
}

impl StopEvent {
    /// Creates a stop event with a result.
    #[must_use]
    pub fn new(result: impl Into<serde_json::Value>) -> Self {
        Self {
            result: result.into(),
        }
    }
}

impl TypedEvent for StopEvent {
    const TAG: &'static str = EventTag::STOP;
}

/// Asks the caller for human input and suspends the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequiredEvent {
    /// The prompt shown to the human.
    pub prefix: String,
}

impl InputRequiredEvent {
    /// Creates an input request.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl TypedEvent for InputRequiredEvent {
    const TAG: &'static str = EventTag::INPUT_REQUIRED;
}

/// A human reply injected by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanResponseEvent {
    /// The reply text.
    pub response: String,
}

impl HumanResponseEvent {
    /// Creates a human response.
    #[must_use]
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl TypedEvent for HumanResponseEvent {
    const TAG: &'static str = EventTag::HUMAN_RESPONSE;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_event_flattens_fields() {
        let event = StartEvent::new().with("topic", "pirates").into_event();
        assert_eq!(event.get_str("topic"), Some("pirates"));

        let back: StartEvent = event.to_typed().unwrap();
        assert_eq!(back.fields.get("topic"), Some(&serde_json::json!("pirates")));
    }

    #[test]
    fn test_stop_event_result() {
        let event = StopEvent::new("done").into_event().unwrap();
        assert!(event.tag().is_terminal());
        assert_eq!(event.get("result"), Some(&serde_json::json!("done")));
    }

    #[test]
    fn test_human_events() {
        let ask = InputRequiredEvent::new("Enter a number: ").into_event().unwrap();
        assert!(ask.tag().is_input_required());

        let reply = HumanResponseEvent::new("42").into_event().unwrap();
        assert_eq!(reply.get_str("response"), Some("42"));
    }
}
