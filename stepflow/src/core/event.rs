//! Tagged messages passed between workflow steps.

use crate::errors::ParseError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Tag naming the category of an [`Event`].
///
/// The tag decides which step consumes the event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTag(String);

impl EventTag {
    /// Tag of the event that usually begins a run.
    pub const START: &'static str = "start";
    /// Tag of the terminal event.
    pub const STOP: &'static str = "stop";
    /// Tag of the event that suspends a run for human input.
    pub const INPUT_REQUIRED: &'static str = "input_required";
    /// Tag of the event carrying a human reply.
    pub const HUMAN_RESPONSE: &'static str = "human_response";

    /// Creates a new tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is the terminal tag.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.0 == Self::STOP
    }

    /// Returns true if this tag suspends a run.
    #[must_use]
    pub fn is_input_required(&self) -> bool {
        self.0 == Self::INPUT_REQUIRED
    }

    /// Returns true if the runner handles this tag itself instead of routing it.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.is_terminal() || self.is_input_required()
    }
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for EventTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl Borrow<str> for EventTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for EventTag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EventTag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A typed event with a fixed tag.
///
/// Implementors are plain serde structs whose fields become the event
/// fields. Use braces for field-less events (`struct PrepEvent {}`) so they
/// serialize as an empty object.
pub trait TypedEvent: Serialize + DeserializeOwned {
    /// The tag carried by every event of this type.
    const TAG: &'static str;

    /// Returns the tag as an [`EventTag`].
    fn tag() -> EventTag {
        EventTag::new(Self::TAG)
    }

    /// Converts this value into an untyped [`Event`].
    fn into_event(self) -> Result<Event, ParseError>
    where
        Self: Sized,
    {
        Event::from_typed(&self)
    }
}

/// An immutable message: a tag plus named JSON fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    tag: EventTag,
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    /// Creates an event with no fields.
    #[must_use]
    pub fn new(tag: impl Into<EventTag>) -> Self {
        Self {
            tag: tag.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Creates an event from a tag and a field map.
    #[must_use]
    pub fn with_fields(
        tag: impl Into<EventTag>,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            tag: tag.into(),
            fields,
        }
    }

    /// Creates an empty `start` event.
    #[must_use]
    pub fn start() -> Self {
        Self::new(EventTag::START)
    }

    /// Adds a field while the event is being constructed.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Builds an event from a typed value.
    pub fn from_typed<T: TypedEvent>(value: &T) -> Result<Self, ParseError> {
        match serde_json::to_value(value)? {
            serde_json::Value::Object(fields) => Ok(Self::with_fields(T::TAG, fields)),
            serde_json::Value::Null => Ok(Self::new(T::TAG)),
            other => Err(ParseError::new(format!(
                "event '{}' must serialize to an object, got {other}",
                T::TAG
            ))),
        }
    }

    /// Returns the tag.
    #[must_use]
    pub fn tag(&self) -> &EventTag {
        &self.tag
    }

    /// Returns true if the event carries the given tag.
    #[must_use]
    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Returns true if the event is of the given typed kind.
    #[must_use]
    pub fn is_a<T: TypedEvent>(&self) -> bool {
        self.is(T::TAG)
    }

    /// Returns all fields.
    #[must_use]
    pub fn fields(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.fields
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    /// Returns a string field.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(serde_json::Value::as_str)
    }

    /// Returns a string field or a parse error naming the missing key.
    pub fn require_str(&self, key: &str) -> Result<&str, ParseError> {
        self.get_str(key).ok_or_else(|| {
            ParseError::new(format!(
                "event '{}' has no string field '{key}'",
                self.tag
            ))
        })
    }

    /// Converts into a typed event, checking the tag.
    pub fn to_typed<T: TypedEvent>(&self) -> Result<T, ParseError> {
        if !self.is(T::TAG) {
            return Err(ParseError::new(format!(
                "expected event '{}', got '{}'",
                T::TAG,
                self.tag
            )));
        }
        self.fields_as()
    }

    /// Deserializes the fields into any type, ignoring the tag.
    pub fn fields_as<T: DeserializeOwned>(&self) -> Result<T, ParseError> {
        serde_json::from_value(serde_json::Value::Object(self.fields.clone())).map_err(|e| {
            ParseError::new(format!("invalid fields for event '{}': {e}", self.tag))
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        if !self.fields.is_empty() {
            write!(f, " {}", serde_json::Value::Object(self.fields.clone()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct JokeEvent {
        joke: String,
    }

    impl TypedEvent for JokeEvent {
        const TAG: &'static str = "joke";
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct PrepEvent {}

    impl TypedEvent for PrepEvent {
        const TAG: &'static str = "prep";
    }

    #[test]
    fn test_event_fields() {
        let event = Event::start().with_field("topic", "pirates");

        assert!(event.is(EventTag::START));
        assert_eq!(event.get_str("topic"), Some("pirates"));
        assert!(event.require_str("missing").is_err());
    }

    #[test]
    fn test_typed_conversion() {
        let event = JokeEvent { joke: "arr".into() }.into_event().unwrap();
        assert_eq!(event.tag().as_str(), "joke");
        assert!(event.is_a::<JokeEvent>());

        let back: JokeEvent = event.to_typed().unwrap();
        assert_eq!(back, JokeEvent { joke: "arr".into() });
    }

    #[test]
    fn test_typed_conversion_checks_tag() {
        let event = Event::new("other").with_field("joke", "x");
        let err = event.to_typed::<JokeEvent>().unwrap_err();
        assert!(err.message.contains("expected event 'joke'"));
    }

    #[test]
    fn test_empty_typed_event() {
        let event = PrepEvent {}.into_event().unwrap();
        assert!(event.fields().is_empty());
        assert_eq!(event.to_typed::<PrepEvent>().unwrap(), PrepEvent {});
    }

    #[test]
    fn test_reserved_tags() {
        assert!(EventTag::new("stop").is_terminal());
        assert!(EventTag::new("input_required").is_reserved());
        assert!(!EventTag::new("start").is_reserved());
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = Event::new("joke").with_field("joke", "arr");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"tag": "joke", "fields": {"joke": "arr"}}));
    }
}
