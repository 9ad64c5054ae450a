//! The per-run stream of published events.

use crate::core::Event;
use futures::channel::mpsc;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Creates a connected writer and stream.
#[must_use]
pub fn event_channel() -> (EventWriter, EventStream) {
    let (tx, rx) = mpsc::unbounded();
    (EventWriter { tx: Some(tx) }, EventStream { rx })
}

/// Publishes events to a run's stream.
///
/// Writes never block. Once the stream has been dropped, writes are ignored.
#[derive(Debug, Clone)]
pub struct EventWriter {
    tx: Option<mpsc::UnboundedSender<Event>>,
}

impl EventWriter {
    /// Creates a writer that discards everything.
    #[must_use]
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    /// Publishes an event. Returns false if nobody can receive it.
    pub fn write(&self, event: Event) -> bool {
        self.tx
            .as_ref()
            .is_some_and(|tx| tx.unbounded_send(event).is_ok())
    }

    /// Returns true if the receiving stream is still alive.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

/// The events published by a run, in publication order.
///
/// The stream ends when the run ends.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_next_unpin(cx)
    }
}
