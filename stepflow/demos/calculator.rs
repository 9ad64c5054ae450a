//! Answers two pricing questions with the calculator flow.
//!
//! Needs `OPENAI_API_KEY`.

use std::sync::Arc;

use stepflow::flows::{calculator_flow, calculator_start};
use stepflow::llm::OpenAiClient;
use stepflow::observability::init_tracing;

const QUERIES: [&str; 2] = [
    "What is the price of a $100 item with a 20% discount?",
    "If I buy something for $85.50 and the tax is 8.5%, what's the total?",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(false);

    let llm = Arc::new(OpenAiClient::from_env()?);
    let workflow = calculator_flow(llm)?;

    for (i, query) in QUERIES.iter().enumerate() {
        println!("\n{}", "=".repeat(60));
        println!("TEST {}: {query}", i + 1);
        println!("{}", "=".repeat(60));

        let answer = workflow.run(calculator_start(*query))?.await?;

        println!("\n{}", "-".repeat(60));
        println!("FINAL ANSWER:");
        println!("{}", "-".repeat(60));
        println!("{}\n", answer.as_str().unwrap_or_default());
    }
    Ok(())
}
