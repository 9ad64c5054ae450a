//! Two-turn chat where the second question relies on the first answer.
//!
//! Needs `OPENAI_API_KEY`.

use std::sync::Arc;

use stepflow::llm::{Conversation, OpenAiClient};
use stepflow::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(false);

    let mut conversation = Conversation::new(Arc::new(OpenAiClient::from_env()?));

    let first = conversation.send("What is the capital of France?").await?;
    println!("> {first}");

    let second = conversation.send("And its population?").await?;
    println!("> {second}");
    Ok(())
}
