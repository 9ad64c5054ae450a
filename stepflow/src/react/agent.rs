//! A tool-using agent expressed as a four-step workflow.
//!
//! `start` -> `prep` -> `llm_input` -> (`tool_call` -> `prep` ...) -> `stop`
//!
//! Chat memory, the scratchpad and the collected tool outputs live in the
//! run's context store, so they survive snapshots and carry over when a new
//! run is started from the previous run's snapshot.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::formatter::ReActChatFormatter;
use super::parser::ReActOutputParser;
use super::types::ReasoningStep;
use crate::context::StepContext;
use crate::core::{Event, EventTag, StopEvent, TypedEvent};
use crate::errors::ValidationError;
use crate::llm::{ChatMemoryBuffer, ChatMessage, LlmClient};
use crate::observability::Observer;
use crate::steps::{Step, StepOutput};
use crate::tools::{Tool, ToolOutput, ToolRegistry, ToolSelection};
use crate::workflow::{Workflow, WorkflowConfig};

/// Store key of the chat memory.
pub const MEMORY_KEY: &str = "memory";
/// Store key of the current scratchpad.
pub const REASONING_KEY: &str = "current_reasoning";
/// Store key of the tool outputs gathered for the current question.
pub const SOURCES_KEY: &str = "sources";
/// Store key of the model-call counter for the current question.
pub const ITERATIONS_KEY: &str = "iterations";

/// Asks the agent to rebuild its prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepEvent {}

impl TypedEvent for PrepEvent {
    const TAG: &'static str = "prep";
}

/// The messages to send to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Full prompt.
    pub input: Vec<ChatMessage>,
}

impl TypedEvent for InputEvent {
    const TAG: &'static str = "llm_input";
}

/// A piece of the model reply, published on the event stream only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Text added by this piece.
    pub delta: String,
}

impl TypedEvent for StreamEvent {
    const TAG: &'static str = "stream";
}

/// Tools the model asked to call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallEvent {
    /// Calls in the order they should run.
    pub tool_calls: Vec<ToolSelection>,
}

impl TypedEvent for ToolCallEvent {
    const TAG: &'static str = "tool_call";
}

/// The result of one agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReActResult {
    /// Final answer.
    pub response: String,
    /// Outputs of the tools called while answering.
    #[serde(default)]
    pub sources: Vec<ToolOutput>,
    /// The scratchpad, ending with the answer.
    #[serde(default)]
    pub reasoning: Vec<ReasoningStep>,
}

fn default_max_iterations() -> usize {
    20
}

fn default_token_limit() -> usize {
    3000
}

/// Agent settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReActConfig {
    /// Background text added to the system prompt.
    #[serde(default)]
    pub context: String,

    /// Model calls allowed per question before the run fails.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Token budget of the chat history sent to the model.
    #[serde(default = "default_token_limit")]
    pub token_limit: usize,
}

impl Default for ReActConfig {
    fn default() -> Self {
        Self {
            context: String::new(),
            max_iterations: default_max_iterations(),
            token_limit: default_token_limit(),
        }
    }
}

impl ReActConfig {
    /// Sets the extra context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Sets the iteration limit.
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Sets the history token budget.
    #[must_use]
    pub fn with_token_limit(mut self, limit: usize) -> Self {
        self.token_limit = limit;
        self
    }
}

#[derive(Debug)]
struct Agent {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    formatter: ReActChatFormatter,
    parser: ReActOutputParser,
    config: ReActConfig,
}

impl Agent {
    fn memory(&self, ctx: &StepContext) -> anyhow::Result<ChatMemoryBuffer> {
        Ok(ctx
            .store()
            .get::<ChatMemoryBuffer>(MEMORY_KEY)?
            .unwrap_or_else(|| ChatMemoryBuffer::new(self.config.token_limit)))
    }

    fn reasoning(ctx: &StepContext) -> anyhow::Result<Vec<ReasoningStep>> {
        Ok(ctx.store().get_or(REASONING_KEY, Vec::new())?)
    }

    fn sources(ctx: &StepContext) -> anyhow::Result<Vec<ToolOutput>> {
        Ok(ctx.store().get_or(SOURCES_KEY, Vec::new())?)
    }
}

/// Builder for the agent workflow.
#[derive(Debug)]
pub struct ReActAgent {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    config: ReActConfig,
    workflow_config: WorkflowConfig,
    observer: Option<Arc<dyn Observer>>,
}

impl ReActAgent {
    /// Name of the built workflow.
    pub const WORKFLOW_NAME: &'static str = "react_agent";

    /// Creates an agent with no tools.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            tools: ToolRegistry::new(),
            config: ReActConfig::default(),
            workflow_config: WorkflowConfig::new().with_timeout(Duration::from_secs(120)),
            observer: None,
        }
    }

    /// Adds a tool.
    #[must_use]
    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools = self.tools.with_tool(tool);
        self
    }

    /// Replaces the tool set.
    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the agent settings.
    #[must_use]
    pub fn config(mut self, config: ReActConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the run settings.
    #[must_use]
    pub fn workflow_config(mut self, config: WorkflowConfig) -> Self {
        self.workflow_config = config;
        self
    }

    /// Sets the observer of the built workflow.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Builds the workflow.
    pub fn build(self) -> Result<Workflow, ValidationError> {
        let agent = Arc::new(Agent {
            llm: self.llm,
            tools: self.tools,
            formatter: ReActChatFormatter::new().with_context(self.config.context.clone()),
            parser: ReActOutputParser::new(),
            config: self.config,
        });

        let mut builder = Workflow::builder(Self::WORKFLOW_NAME)
            .config(self.workflow_config)
            .step(NewUserMessage(agent.clone()))
            .step(PrepareChatHistory(agent.clone()))
            .step(HandleLlmInput(agent.clone()))
            .step(HandleToolCalls(agent));
        if let Some(observer) = self.observer {
            builder = builder.observer(observer);
        }
        builder.build()
    }

    /// Returns the start event asking `input`.
    #[must_use]
    pub fn start_event(input: impl Into<String>) -> Event {
        Event::start().with_field("input", input.into())
    }
}

#[derive(Debug)]
struct NewUserMessage(Arc<Agent>);

#[async_trait]
impl Step for NewUserMessage {
    fn name(&self) -> &str {
        "new_user_msg"
    }

    fn accepts(&self) -> EventTag {
        EventTag::new(EventTag::START)
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![PrepEvent::tag()]
    }

    async fn run(&self, event: Event, ctx: &StepContext) -> anyhow::Result<StepOutput> {
        let input = event.require_str("input")?;
        let store = ctx.store();

        store.set(SOURCES_KEY, &Vec::<ToolOutput>::new())?;
        let mut memory = self.0.memory(ctx)?;
        memory.put(ChatMessage::user(input));
        store.set(REASONING_KEY, &Vec::<ReasoningStep>::new())?;
        store.set(ITERATIONS_KEY, &0usize)?;
        store.set(MEMORY_KEY, &memory)?;

        Ok(StepOutput::typed(&PrepEvent {})?)
    }
}

#[derive(Debug)]
struct PrepareChatHistory(Arc<Agent>);

#[async_trait]
impl Step for PrepareChatHistory {
    fn name(&self) -> &str {
        "prepare_chat_history"
    }

    fn accepts(&self) -> EventTag {
        PrepEvent::tag()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![InputEvent::tag()]
    }

    async fn run(&self, _event: Event, ctx: &StepContext) -> anyhow::Result<StepOutput> {
        let agent = &self.0;
        let history = agent.memory(ctx)?.get();
        let reasoning = Agent::reasoning(ctx)?;

        let input = agent
            .formatter
            .format(&agent.tools.metadata(), &history, &reasoning);
        Ok(StepOutput::typed(&InputEvent { input })?)
    }
}

#[derive(Debug)]
struct HandleLlmInput(Arc<Agent>);

#[async_trait]
impl Step for HandleLlmInput {
    fn name(&self) -> &str {
        "handle_llm_input"
    }

    fn accepts(&self) -> EventTag {
        InputEvent::tag()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![ToolCallEvent::tag(), PrepEvent::tag(), StopEvent::tag()]
    }

    async fn run(&self, event: Event, ctx: &StepContext) -> anyhow::Result<StepOutput> {
        let agent = &self.0;
        let store = ctx.store();
        let InputEvent { input } = event.to_typed()?;

        let iterations = store.get_or(ITERATIONS_KEY, 0usize)? + 1;
        if iterations > agent.config.max_iterations {
            anyhow::bail!(
                "Reached max iterations ({}) without a final answer",
                agent.config.max_iterations
            );
        }
        store.set(ITERATIONS_KEY, &iterations)?;

        let mut deltas = agent.llm.stream_chat(&input).await?;
        let mut reply = String::new();
        while let Some(delta) = deltas.next().await {
            let delta = delta?;
            reply.push_str(&delta.delta);
            ctx.write_event_to_stream(Event::from_typed(&StreamEvent { delta: delta.delta })?);
        }

        let mut reasoning = Agent::reasoning(ctx)?;
        match agent.parser.parse(&reply) {
            Ok(ReasoningStep::Response { thought, response }) => {
                let mut memory = agent.memory(ctx)?;
                memory.put(ChatMessage::assistant(response.clone()));
                reasoning.push(ReasoningStep::Response {
                    thought,
                    response: response.clone(),
                });
                store.set(MEMORY_KEY, &memory)?;
                store.set(REASONING_KEY, &reasoning)?;

                let result = ReActResult {
                    response,
                    sources: Agent::sources(ctx)?,
                    reasoning,
                };
                Ok(StepOutput::stop(serde_json::to_value(result)?))
            }
            Ok(ReasoningStep::Action {
                thought,
                action,
                action_input,
            }) => {
                let call = ToolSelection::new("fake", action.clone(), action_input.clone());
                reasoning.push(ReasoningStep::Action {
                    thought,
                    action,
                    action_input,
                });
                store.set(REASONING_KEY, &reasoning)?;
                Ok(StepOutput::typed(&ToolCallEvent {
                    tool_calls: vec![call],
                })?)
            }
            Ok(step @ ReasoningStep::Observation { .. }) => {
                reasoning.push(step);
                store.set(REASONING_KEY, &reasoning)?;
                Ok(StepOutput::typed(&PrepEvent {})?)
            }
            Err(err) => {
                tracing::debug!(error = %err, "Model output did not parse");
                reasoning.push(ReasoningStep::observation(format!(
                    "There was an error in parsing my reasoning: {}",
                    err.message
                )));
                store.set(REASONING_KEY, &reasoning)?;
                Ok(StepOutput::typed(&PrepEvent {})?)
            }
        }
    }
}

#[derive(Debug)]
struct HandleToolCalls(Arc<Agent>);

#[async_trait]
impl Step for HandleToolCalls {
    fn name(&self) -> &str {
        "handle_tool_calls"
    }

    fn accepts(&self) -> EventTag {
        ToolCallEvent::tag()
    }

    fn emits(&self) -> Vec<EventTag> {
        vec![PrepEvent::tag()]
    }

    async fn run(&self, event: Event, ctx: &StepContext) -> anyhow::Result<StepOutput> {
        let agent = &self.0;
        let ToolCallEvent { tool_calls } = event.to_typed()?;
        let mut reasoning = Agent::reasoning(ctx)?;
        let mut sources = Agent::sources(ctx)?;

        for call in &tool_calls {
            let output = agent.tools.call_as_observation(call).await;
            reasoning.push(ReasoningStep::observation(output.content.clone()));
            if !output.is_error {
                sources.push(output);
            }
        }

        ctx.store().set(SOURCES_KEY, &sources)?;
        ctx.store().set(REASONING_KEY, &reasoning)?;
        Ok(StepOutput::typed(&PrepEvent {})?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RunStatus;
    use crate::llm::ScriptedLlm;
    use crate::testing::collect_events;
    use crate::tools::{add_tool, multiply_tool};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn agent(llm: Arc<ScriptedLlm>) -> Workflow {
        ReActAgent::new(llm)
            .tool(add_tool())
            .tool(multiply_tool())
            .build()
            .unwrap()
    }

    const ADD_CALL: &str = "Thought: The current language of the user is: English. I need to use a tool to help me answer the question.\nAction: add\nAction Input: {\"x\": 103223, \"y\": 320292}";
    const ADD_ANSWER: &str = "Thought: I can answer without using any more tools. I'll use the user's language to answer\nAnswer: 103223 + 320292 = 423515";

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let llm = Arc::new(ScriptedLlm::new([ADD_CALL, ADD_ANSWER]));
        let workflow = agent(llm.clone());

        let handle = workflow.run(ReActAgent::start_event("what is 103223+320292")).unwrap();
        let result: ReActResult = serde_json::from_value(handle.await.unwrap()).unwrap();

        assert_eq!(result.response, "103223 + 320292 = 423515");
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].content, "423515");
        assert_eq!(result.reasoning.len(), 3);
        assert_eq!(result.reasoning[1], ReasoningStep::observation("423515"));

        // The second prompt carries the action and its observation.
        let second = &llm.requests()[1];
        assert_eq!(second.last().unwrap().content, "Observation: 423515");
        assert!(second[0].content.contains("> Tool Name: add"));
    }

    #[tokio::test]
    async fn test_parse_error_becomes_observation() {
        let llm = Arc::new(ScriptedLlm::new([
            "Thought: hmm, let me think",
            "Thought: I can answer.\nAnswer: 42",
        ]));
        let handle = agent(llm.clone()).run(ReActAgent::start_event("meaning of life?")).unwrap();
        let result: ReActResult = serde_json::from_value(handle.await.unwrap()).unwrap();

        assert_eq!(result.response, "42");
        match &result.reasoning[0] {
            ReasoningStep::Observation { observation } => {
                assert!(observation.starts_with("There was an error in parsing my reasoning: Could not parse output"));
            }
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_observed() {
        let llm = Arc::new(ScriptedLlm::new([
            "Thought: divide\nAction: divide\nAction Input: {\"x\": 1, \"y\": 2}",
            "Thought: no tool for that.\nAnswer: I cannot divide.",
        ]));
        let handle = agent(llm).run(ReActAgent::start_event("1/2?")).unwrap();
        let result: ReActResult = serde_json::from_value(handle.await.unwrap()).unwrap();

        assert!(result.sources.is_empty());
        assert_eq!(result.reasoning[1], ReasoningStep::observation("Tool divide does not exist"));
    }

    #[tokio::test]
    async fn test_streams_deltas_before_stop() {
        let llm = Arc::new(ScriptedLlm::new([
            "Why did the pirate go to school? To improve his arrrticulation!",
        ]));
        let handle = agent(llm).run(ReActAgent::start_event("Hello! Tell me a joke.")).unwrap();
        let stream = handle.stream_events().unwrap();

        let result = handle.await.unwrap();
        let events = collect_events(stream).await;

        let text: String = events
            .iter()
            .filter(|e| e.is(StreamEvent::TAG))
            .map(|e| e.get_str("delta").unwrap_or_default().to_string())
            .collect();
        assert_eq!(text, "Why did the pirate go to school? To improve his arrrticulation!");
        assert_eq!(result["response"], json!(text));
        assert!(events.last().unwrap().is(StopEvent::TAG));
    }

    #[tokio::test]
    async fn test_memory_carries_over_through_snapshot() {
        let llm = Arc::new(ScriptedLlm::new([
            ADD_CALL,
            ADD_ANSWER,
            "Thought: I can answer.\nAnswer: Your last question was: what is 103223+320292",
        ]));
        let workflow = agent(llm.clone());

        let first = workflow.run(ReActAgent::start_event("what is 103223+320292")).unwrap();
        let context = first.context();
        first.await.unwrap();

        let second = workflow
            .run_from_snapshot(
                context.snapshot(),
                Some(ReActAgent::start_event("what was my last question")),
            )
            .unwrap();
        let context = second.context();
        let result: ReActResult = serde_json::from_value(second.await.unwrap()).unwrap();

        assert!(result.response.contains("what is 103223+320292"));
        assert!(result.sources.is_empty());
        assert_eq!(context.status(), RunStatus::Completed);

        let memory: ChatMemoryBuffer = context.get(MEMORY_KEY).unwrap().unwrap();
        assert_eq!(memory.len(), 4);

        let third_prompt = &llm.requests()[2];
        assert!(third_prompt
            .iter()
            .any(|m| m.content == "what is 103223+320292"));
    }

    #[tokio::test]
    async fn test_iteration_limit_fails_run() {
        let llm = Arc::new(ScriptedLlm::always("Thought: still thinking"));
        let workflow = ReActAgent::new(llm)
            .config(ReActConfig::default().with_max_iterations(3))
            .build()
            .unwrap();

        let err = workflow
            .run(ReActAgent::start_event("loop forever"))
            .unwrap()
            .await
            .unwrap_err();
        let step_err = err.as_step().unwrap();
        assert_eq!(step_err.step, "handle_llm_input");
        assert!(step_err.cause().to_string().contains("max iterations (3)"));
    }

    #[test]
    fn test_config_defaults() {
        let config: ReActConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReActConfig::default());
        assert_eq!(config.max_iterations, 20);
    }
}
