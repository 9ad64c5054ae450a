//! Mock steps for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::context::StepContext;
use crate::core::{Event, EventTag};
use crate::steps::{Step, StepOutput};

/// A step that records what it receives and returns a configurable output.
#[derive(Debug)]
pub struct EmitStep {
    name: String,
    accepts: EventTag,
    emits: Vec<EventTag>,
    output: Mutex<StepOutput>,
    received: Mutex<Vec<Event>>,
}

impl EmitStep {
    /// Creates a step that emits nothing.
    #[must_use]
    pub fn new(name: impl Into<String>, accepts: impl Into<EventTag>) -> Self {
        Self {
            name: name.into(),
            accepts: accepts.into(),
            emits: Vec::new(),
            output: Mutex::new(StepOutput::none()),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Declares an emission.
    #[must_use]
    pub fn emits(mut self, tag: impl Into<EventTag>) -> Self {
        self.emits.push(tag.into());
        self
    }

    /// Adds an event to the output returned on every call.
    #[must_use]
    pub fn producing(self, event: Event) -> Self {
        self.output.lock().push(event);
        self
    }

    /// Replaces the output.
    pub fn set_output(&self, output: StepOutput) {
        *self.output.lock() = output;
    }

    /// Returns the number of times the step ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.received.lock().len()
    }

    /// Returns every event the step received.
    #[must_use]
    pub fn received(&self) -> Vec<Event> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl Step for EmitStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self) -> EventTag {
        self.accepts.clone()
    }

    fn emits(&self) -> Vec<EventTag> {
        self.emits.clone()
    }

    async fn run(&self, event: Event, _ctx: &StepContext) -> anyhow::Result<StepOutput> {
        self.received.lock().push(event);
        Ok(self.output.lock().clone())
    }
}

/// A step that always fails, optionally writing to the store first.
#[derive(Debug)]
pub struct FailingStep {
    name: String,
    accepts: EventTag,
    error: String,
    write: Option<(String, serde_json::Value)>,
}

impl FailingStep {
    /// Creates a new failing step.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        accepts: impl Into<EventTag>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            accepts: accepts.into(),
            error: error.into(),
            write: None,
        }
    }

    /// Writes `key` before failing.
    #[must_use]
    pub fn writing(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.write = Some((key.into(), value));
        self
    }
}

#[async_trait]
impl Step for FailingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self) -> EventTag {
        self.accepts.clone()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![EventTag::new(EventTag::STOP)]
    }

    async fn run(&self, _event: Event, ctx: &StepContext) -> anyhow::Result<StepOutput> {
        if let Some((key, value)) = &self.write {
            ctx.store().set_value(key.clone(), value.clone());
        }
        Err(anyhow::anyhow!("{}", self.error))
    }
}

/// A step that sleeps before emitting `stop`.
#[derive(Debug)]
pub struct SlowStep {
    name: String,
    accepts: EventTag,
    delay: Duration,
}

impl SlowStep {
    /// Creates a new slow step.
    #[must_use]
    pub fn new(name: impl Into<String>, accepts: impl Into<EventTag>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            accepts: accepts.into(),
            delay,
        }
    }

    /// Creates a slow step with a delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(name: impl Into<String>, accepts: impl Into<EventTag>, ms: u64) -> Self {
        Self::new(name, accepts, Duration::from_millis(ms))
    }
}

#[async_trait]
impl Step for SlowStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self) -> EventTag {
        self.accepts.clone()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![EventTag::new(EventTag::STOP)]
    }

    async fn run(&self, _event: Event, _ctx: &StepContext) -> anyhow::Result<StepOutput> {
        tokio::time::sleep(self.delay).await;
        Ok(StepOutput::stop("slow"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_step_records_and_emits() {
        let step = EmitStep::new("a", "start")
            .emits("next")
            .producing(Event::new("next"));

        let output = step
            .run(Event::start(), &StepContext::detached("a"))
            .await
            .unwrap();

        assert_eq!(output.len(), 1);
        assert_eq!(step.call_count(), 1);
        assert!(step.received()[0].is("start"));
    }

    #[tokio::test]
    async fn test_failing_step_writes_then_fails() {
        let step = FailingStep::new("bad", "start", "boom").writing("k", serde_json::json!(1));
        let ctx = StepContext::detached("bad");

        let err = step.run(Event::start(), &ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(ctx.store().contains_key("k"));
    }

    #[tokio::test]
    async fn test_slow_step() {
        let step = SlowStep::with_delay_ms("slow", "start", 5);
        let output = step
            .run(Event::start(), &StepContext::detached("slow"))
            .await
            .unwrap();
        assert!(output.events()[0].tag().is_terminal());
    }
}
