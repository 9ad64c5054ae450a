//! Streams a ReAct agent's reply token by token, then asks a follow-up in a
//! second run that carries the chat memory over.
//!
//! Needs `OPENAI_API_KEY`.

use std::io::Write as _;
use std::sync::Arc;

use futures::StreamExt;

use stepflow::llm::{LlmConfig, OpenAiClient};
use stepflow::observability::init_tracing;
use stepflow::react::{ReActAgent, ReActResult, StreamEvent};
use stepflow::tools::{add_tool, multiply_tool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(false);

    let llm = Arc::new(OpenAiClient::new(LlmConfig::from_env()?.with_model("gpt-4o"))?);
    let agent = ReActAgent::new(llm)
        .tool(add_tool())
        .tool(multiply_tool())
        .build()?;

    let handle = agent.run(ReActAgent::start_event("Hello! Tell me a joke."))?;
    let mut events = handle.stream_events()?;
    while let Some(event) = events.next().await {
        if event.is_a::<StreamEvent>() {
            print!("{}", event.get_str("delta").unwrap_or_default());
            std::io::stdout().flush()?;
        }
    }
    println!();
    let context = handle.context();
    handle.await?;

    let follow_up = agent.run_from_snapshot(
        context.snapshot(),
        Some(ReActAgent::start_event("what is 103223+320292")),
    )?;
    let result: ReActResult = serde_json::from_value(follow_up.await?)?;
    println!("{}", result.response);
    for source in &result.sources {
        println!("  [{}] {}", source.tool_name, source.content);
    }
    Ok(())
}
