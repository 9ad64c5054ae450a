//! Observability utilities.

mod observer;
mod subscriber;

pub use observer::{
    CollectingObserver, LoggingObserver, NoOpObserver, Observer, Signal, SignalKind,
};
pub use subscriber::{init_tracing, SpanTimer, DEFAULT_FILTER};
