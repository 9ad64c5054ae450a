//! What a step hands back to the runner.

use crate::core::{Event, InputRequiredEvent, StopEvent, TypedEvent};
use crate::errors::ParseError;

/// The events emitted by one step invocation, in emission order.
///
/// An empty output is valid: the step consumed its event and produced
/// nothing for the runner to route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    events: Vec<Event>,
}

impl StepOutput {
    /// Creates an output with no emissions.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates an output with a single emission.
    #[must_use]
    pub fn one(event: Event) -> Self {
        Self {
            events: vec![event],
        }
    }

    /// Creates an output from several emissions.
    #[must_use]
    pub fn many(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Creates an output from a typed event.
    pub fn typed<T: TypedEvent>(event: &T) -> Result<Self, ParseError> {
        Ok(Self::one(Event::from_typed(event)?))
    }

    /// Creates a terminal output.
    #[must_use]
    pub fn stop(result: impl Into<serde_json::Value>) -> Self {
        Self::one(Event::new(StopEvent::TAG).with_field("result", result.into()))
    }

    /// Creates an output that suspends the run for human input.
    #[must_use]
    pub fn input_required(prefix: impl Into<String>) -> Self {
        Self::one(
            Event::new(InputRequiredEvent::TAG).with_field("prefix", prefix.into()),
        )
    }

    /// Appends an emission.
    #[must_use]
    pub fn with(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Appends an emission in place.
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Returns the emissions.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Returns the number of emissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Consumes the output and returns the emissions.
    #[must_use]
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl From<Event> for StepOutput {
    fn from(event: Event) -> Self {
        Self::one(event)
    }
}

impl From<Vec<Event>> for StepOutput {
    fn from(events: Vec<Event>) -> Self {
        Self::many(events)
    }
}

impl IntoIterator for StepOutput {
    type Item = Event;
    type IntoIter = std::vec::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
