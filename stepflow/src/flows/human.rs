//! Flows that pause for a human reply.
//!
//! Both ask one question with `input_required` and finish on the
//! `human_response`. The caller can answer inside the same run with
//! `RunHandle::send_event`, or snapshot the run, cancel it, and answer later
//! through `Workflow::run_from_snapshot`.

use async_trait::async_trait;
use std::fmt;

use crate::context::StepContext;
use crate::core::{Event, EventTag, HumanResponseEvent, InputRequiredEvent, StartEvent, StopEvent, TypedEvent};
use crate::errors::ValidationError;
use crate::steps::{Step, StepOutput};
use crate::workflow::Workflow;

/// Store key holding the last reply received.
pub const REPLY_KEY: &str = "human_reply";

/// Name of the echo flow.
pub const ECHO_FLOW: &str = "human_echo";
/// Name of the greeting flow.
pub const GREETING_FLOW: &str = "human_greeting";

/// Returns the reply as typed. Asks `Enter a number: `.
pub fn echo_flow() -> Result<Workflow, ValidationError> {
    Workflow::builder(ECHO_FLOW)
        .step(AskHuman::new("Enter a number: "))
        .step(AnswerHuman::new(|reply| reply.to_string()))
        .build()
}

/// Returns `Hello, <reply>`. Asks `What is your name? `.
pub fn greeting_flow() -> Result<Workflow, ValidationError> {
    Workflow::builder(GREETING_FLOW)
        .step(AskHuman::new("What is your name? "))
        .step(AnswerHuman::new(|reply| format!("Hello, {reply}")))
        .build()
}

#[derive(Debug)]
struct AskHuman {
    prompt: String,
}

impl AskHuman {
    fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

#[async_trait]
impl Step for AskHuman {
    fn name(&self) -> &str {
        "ask"
    }

    fn accepts(&self) -> EventTag {
        StartEvent::tag()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![InputRequiredEvent::tag()]
    }

    async fn run(&self, _event: Event, _ctx: &StepContext) -> anyhow::Result<StepOutput> {
        Ok(StepOutput::input_required(self.prompt.clone()))
    }
}

struct AnswerHuman {
    render: fn(&str) -> String,
}

impl AnswerHuman {
    const fn new(render: fn(&str) -> String) -> Self {
        Self { render }
    }
}

impl fmt::Debug for AnswerHuman {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerHuman").finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for AnswerHuman {
    fn name(&self) -> &str {
        "answer"
    }

    fn accepts(&self) -> EventTag {
        HumanResponseEvent::tag()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![StopEvent::tag()]
    }

    async fn run(&self, event: Event, ctx: &StepContext) -> anyhow::Result<StepOutput> {
        let HumanResponseEvent { response } = event.to_typed()?;
        ctx.store().set(REPLY_KEY, &response)?;
        Ok(StepOutput::stop((self.render)(&response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextSnapshot;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn reply(text: &str) -> Event {
        HumanResponseEvent::new(text).into_event().unwrap()
    }

    #[tokio::test]
    async fn test_echo_answered_in_run() {
        let handle = echo_flow().unwrap().run(Event::start()).unwrap();
        let mut events = handle.stream_events().unwrap();

        while let Some(event) = events.next().await {
            if event.is_a::<InputRequiredEvent>() {
                assert_eq!(event.get_str("prefix"), Some("Enter a number: "));
                handle.send_event(reply("42")).unwrap();
            }
        }

        assert_eq!(handle.await.unwrap(), json!("42"));
    }

    #[tokio::test]
    async fn test_greeting_resumed_from_snapshot() {
        let workflow = greeting_flow().unwrap();
        let handle = workflow.run(Event::start()).unwrap();
        let mut events = handle.stream_events().unwrap();

        let mut question = None;
        while let Some(event) = events.next().await {
            if event.is_a::<InputRequiredEvent>() {
                question = event.get_str("prefix").map(str::to_string);
                break;
            }
        }
        let saved = handle.snapshot().to_json().unwrap();
        handle.cancel("waiting for the user");
        assert!(handle.await.unwrap_err().is_cancelled());
        assert_eq!(question.as_deref(), Some("What is your name? "));

        let restored = ContextSnapshot::from_json(&saved).unwrap();
        let resumed = workflow.run_from_snapshot(restored, Some(reply("Ada"))).unwrap();
        let context = resumed.context();

        assert_eq!(resumed.await.unwrap(), json!("Hello, Ada"));
        assert_eq!(context.get::<String>(REPLY_KEY).unwrap().as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_both_strategies_agree() {
        let direct = {
            let handle = greeting_flow().unwrap().run(Event::start()).unwrap();
            handle.send_event(reply("Grace")).unwrap();
            handle.await.unwrap()
        };

        let workflow = greeting_flow().unwrap();
        let handle = workflow.run(Event::start()).unwrap();
        let mut events = handle.stream_events().unwrap();
        while let Some(event) = events.next().await {
            if event.tag().is_input_required() {
                break;
            }
        }
        let snapshot = handle.snapshot();
        handle.cancel("suspend");
        let _ = handle.await;
        let resumed = workflow
            .run_from_snapshot(snapshot, Some(reply("Grace")))
            .unwrap()
            .await
            .unwrap();

        assert_eq!(direct, resumed);
    }
}
