//! Step trait and implementations.
//!
//! Steps are the units of work of a workflow. Each step consumes events of
//! exactly one tag and declares the tags it may emit.

mod output;

pub use output::StepOutput;

use crate::context::StepContext;
use crate::core::{Event, EventTag, TypedEvent};
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;

/// Trait for workflow steps.
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Returns the name of the step.
    fn name(&self) -> &str;

    /// Returns the tag of the events this step consumes.
    fn accepts(&self) -> EventTag;

    /// Returns the tags this step may emit.
    fn emits(&self) -> Vec<EventTag>;

    /// Handles one event.
    ///
    /// Errors abort the run. Store writes made through `ctx` are discarded
    /// when an error is returned.
    async fn run(&self, event: Event, ctx: &StepContext) -> anyhow::Result<StepOutput>;
}

/// A step backed by an async closure.
pub struct FnStep<F, Fut>
where
    F: Fn(Event, StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<StepOutput>> + Send,
{
    name: String,
    accepts: EventTag,
    emits: Vec<EventTag>,
    func: F,
    _phantom: std::marker::PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnStep<F, Fut>
where
    F: Fn(Event, StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<StepOutput>> + Send,
{
    /// Creates a function step consuming `accepts`.
    pub fn new(name: impl Into<String>, accepts: impl Into<EventTag>, func: F) -> Self {
        Self {
            name: name.into(),
            accepts: accepts.into(),
            emits: Vec::new(),
            func,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Declares a tag this step may emit.
    #[must_use]
    pub fn emits(mut self, tag: impl Into<EventTag>) -> Self {
        self.emits.push(tag.into());
        self
    }

    /// Declares a typed event this step may emit.
    #[must_use]
    pub fn emits_typed<T: TypedEvent>(self) -> Self {
        self.emits(T::TAG)
    }
}

impl<F, Fut> Debug for FnStep<F, Fut>
where
    F: Fn(Event, StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<StepOutput>> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("accepts", &self.accepts)
            .field("emits", &self.emits)
            .finish()
    }
}

#[async_trait]
impl<F, Fut> Step for FnStep<F, Fut>
where
    F: Fn(Event, StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<StepOutput>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self) -> EventTag {
        self.accepts.clone()
    }

    fn emits(&self) -> Vec<EventTag> {
        self.emits.clone()
    }

    async fn run(&self, event: Event, ctx: &StepContext) -> anyhow::Result<StepOutput> {
        (self.func)(event, ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StopEvent;

    async fn echo_topic(event: Event, _ctx: StepContext) -> anyhow::Result<StepOutput> {
        let topic = event.require_str("topic")?.to_string();
        Ok(StepOutput::stop(topic))
    }

    async fn mark_seen(_event: Event, ctx: StepContext) -> anyhow::Result<StepOutput> {
        ctx.store().set("seen", &true)?;
        Ok(StepOutput::none())
    }

    async fn needs_missing(event: Event, _ctx: StepContext) -> anyhow::Result<StepOutput> {
        event.require_str("missing")?;
        Ok(StepOutput::none())
    }

    #[tokio::test]
    async fn test_fn_step_runs_closure() {
        let step = FnStep::new("echo", "start", echo_topic).emits_typed::<StopEvent>();

        assert_eq!(step.name(), "echo");
        assert_eq!(step.accepts(), EventTag::new("start"));
        assert_eq!(Step::emits(&step), vec![EventTag::new("stop")]);

        let ctx = StepContext::detached("echo");
        let output = step
            .run(Event::start().with_field("topic", "pirates"), &ctx)
            .await
            .unwrap();
        assert_eq!(output.events()[0].get_str("result"), Some("pirates"));
    }

    #[tokio::test]
    async fn test_fn_step_writes_through_shared_store() {
        let step = FnStep::new("count", "start", mark_seen);

        let ctx = StepContext::detached("count");
        step.run(Event::start(), &ctx).await.unwrap();
        assert_eq!(ctx.store().get::<bool>("seen").unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_fn_step_error_propagates() {
        let step = FnStep::new("bad", "start", needs_missing);

        let err = step
            .run(Event::start(), &StepContext::detached("bad"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
