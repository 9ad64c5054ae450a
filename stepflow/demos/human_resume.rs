//! Suspends at the human prompt, saves the context as JSON, and finishes
//! later in a fresh run restored from it.

use futures::StreamExt;

use stepflow::context::ContextSnapshot;
use stepflow::core::{Event, HumanResponseEvent, InputRequiredEvent, TypedEvent};
use stepflow::flows::greeting_flow;
use stepflow::observability::init_tracing;

const REPLY: &str = "Ada";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(false);

    let workflow = greeting_flow()?;
    let handle = workflow.run(Event::start())?;
    let mut events = handle.stream_events()?;

    let mut question = String::new();
    while let Some(event) = events.next().await {
        if event.is_a::<InputRequiredEvent>() {
            question = event.to_typed::<InputRequiredEvent>()?.prefix;
            break;
        }
    }

    // Store this anywhere; it is plain JSON.
    let saved = handle.snapshot().to_json()?;
    handle.cancel("waiting for a human");
    let _ = handle.await;
    println!("Saved {} bytes of context", saved.len());

    println!("{question}{REPLY}");
    let restored = ContextSnapshot::from_json(&saved)?;
    let resumed = workflow.run_from_snapshot(
        restored,
        Some(HumanResponseEvent::new(REPLY).into_event()?),
    )?;

    let mut events = resumed.stream_events()?;
    while events.next().await.is_some() {}

    let result = resumed.await?;
    println!("{}", result.as_str().unwrap_or_default());
    Ok(())
}
