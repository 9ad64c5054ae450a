//! Two-step flow: write a joke about a topic, then critique it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::context::StepContext;
use crate::core::{Event, EventTag, StartEvent, StopEvent, TypedEvent};
use crate::errors::ValidationError;
use crate::llm::LlmClient;
use crate::steps::{Step, StepOutput};
use crate::workflow::{Workflow, WorkflowConfig};

/// A generated joke on its way to the critic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JokeEvent {
    /// Joke text.
    pub joke: String,
}

impl TypedEvent for JokeEvent {
    const TAG: &'static str = "joke";
}

/// Name of the built workflow.
pub const JOKE_FLOW: &str = "joke_flow";

/// Builds the joke flow. The result is the critique text.
pub fn joke_flow(llm: Arc<dyn LlmClient>) -> Result<Workflow, ValidationError> {
    Workflow::builder(JOKE_FLOW)
        .config(WorkflowConfig::new().with_timeout(Duration::from_secs(60)))
        .step(GenerateJoke { llm: llm.clone() })
        .step(CritiqueJoke { llm })
        .build()
}

/// Start event asking for a joke about `topic`.
#[must_use]
pub fn joke_start(topic: impl Into<String>) -> Event {
    StartEvent::new().with("topic", topic.into()).into_event()
}

#[derive(Debug)]
struct GenerateJoke {
    llm: Arc<dyn LlmClient>,
}

#[async_trait]
impl Step for GenerateJoke {
    fn name(&self) -> &str {
        "generate_joke"
    }

    fn accepts(&self) -> EventTag {
        StartEvent::tag()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![JokeEvent::tag()]
    }

    async fn run(&self, event: Event, _ctx: &StepContext) -> anyhow::Result<StepOutput> {
        let topic = event.require_str("topic")?;
        let response = self
            .llm
            .complete(&format!("Write your best joke about {topic}."))
            .await?;
        Ok(StepOutput::typed(&JokeEvent {
            joke: response.text,
        })?)
    }
}

#[derive(Debug)]
struct CritiqueJoke {
    llm: Arc<dyn LlmClient>,
}

#[async_trait]
impl Step for CritiqueJoke {
    fn name(&self) -> &str {
        "critique_joke"
    }

    fn accepts(&self) -> EventTag {
        JokeEvent::tag()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![StopEvent::tag()]
    }

    async fn run(&self, event: Event, _ctx: &StepContext) -> anyhow::Result<StepOutput> {
        let JokeEvent { joke } = event.to_typed()?;
        let response = self
            .llm
            .complete(&format!(
                "Give a thorough analysis and critique of the following joke: {joke}"
            ))
            .await?;
        Ok(StepOutput::stop(response.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;
    use crate::testing::{assert_tags, collect_events};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const JOKE: &str = "Why couldn't the pirate play cards? He was sitting on the deck.";
    const CRITIQUE: &str = "A classic pun on 'deck' with a tidy setup.";

    #[tokio::test]
    async fn test_result_is_critique_verbatim() {
        let llm = Arc::new(ScriptedLlm::new([JOKE, CRITIQUE]));
        let handle = joke_flow(llm.clone()).unwrap().run(joke_start("pirates")).unwrap();

        assert_eq!(handle.await.unwrap(), json!(CRITIQUE));

        let prompts: Vec<String> = llm
            .requests()
            .iter()
            .map(|messages| messages[0].content.clone())
            .collect();
        assert_eq!(
            prompts,
            vec![
                "Write your best joke about pirates.".to_string(),
                format!("Give a thorough analysis and critique of the following joke: {JOKE}"),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_shows_joke_then_stop() {
        let llm = Arc::new(ScriptedLlm::new([JOKE, CRITIQUE]));
        let handle = joke_flow(llm).unwrap().run(joke_start("pirates")).unwrap();
        let events = collect_events(handle.stream_events().unwrap()).await;

        assert_tags(&events, &["joke", "stop"]);
        assert_eq!(events[0].get_str("joke"), Some(JOKE));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_topic_fails_first_step() {
        let llm = Arc::new(ScriptedLlm::new([JOKE]));
        let err = joke_flow(llm.clone())
            .unwrap()
            .run(Event::start())
            .unwrap()
            .await
            .unwrap_err();

        assert_eq!(err.as_step().unwrap().step, "generate_joke");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_error_aborts_run() {
        let llm = Arc::new(ScriptedLlm::new([JOKE]));
        let err = joke_flow(llm).unwrap().run(joke_start("pirates")).unwrap().await.unwrap_err();
        assert_eq!(err.as_step().unwrap().step, "critique_joke");
    }
}
