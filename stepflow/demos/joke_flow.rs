//! Writes a joke about pirates, then critiques it.
//!
//! Needs `OPENAI_API_KEY`.

use std::sync::Arc;

use stepflow::flows::{joke_flow, joke_start};
use stepflow::llm::{LlmConfig, OpenAiClient};
use stepflow::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(false);

    let llm = Arc::new(OpenAiClient::new(LlmConfig::from_env()?.with_temperature(0.0))?);
    let critique = joke_flow(llm)?.run(joke_start("pirates"))?.await?;

    println!("{}", critique.as_str().unwrap_or_default());
    Ok(())
}
