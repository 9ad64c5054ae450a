//! Assertion helpers for event streams.

use crate::core::Event;
use crate::workflow::EventStream;
use futures::StreamExt;
use std::time::Duration;

/// Collects every event of a stream until it ends.
///
/// # Panics
///
/// Panics if the stream does not end within five seconds.
pub async fn collect_events(stream: EventStream) -> Vec<Event> {
    tokio::time::timeout(Duration::from_secs(5), stream.collect::<Vec<_>>())
        .await
        .expect("event stream did not end")
}

/// Returns the tags of `events` as strings.
#[must_use]
pub fn tags_of(events: &[Event]) -> Vec<String> {
    events.iter().map(|e| e.tag().to_string()).collect()
}

/// Asserts that `events` carry exactly the given tags, in order.
///
/// # Panics
///
/// Panics if the tags differ.
pub fn assert_tags(events: &[Event], expected: &[&str]) {
    let actual = tags_of(events);
    assert_eq!(actual, expected, "unexpected event tags");
}

/// Asserts that at least one event carries `tag`.
///
/// # Panics
///
/// Panics if no event carries the tag.
pub fn assert_contains_tag(events: &[Event], tag: &str) {
    assert!(
        events.iter().any(|e| e.is(tag)),
        "expected an event tagged '{tag}', got {:?}",
        tags_of(events)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::event_channel;

    #[tokio::test]
    async fn test_collect_and_assert() {
        let (writer, stream) = event_channel();
        writer.write(Event::new("joke"));
        writer.write(Event::new("stop"));
        drop(writer);

        let events = collect_events(stream).await;
        assert_tags(&events, &["joke", "stop"]);
        assert_contains_tag(&events, "stop");
    }
}
