//! Answers an `input_required` prompt from inside the running workflow.

use futures::StreamExt;

use stepflow::core::{Event, HumanResponseEvent, InputRequiredEvent, TypedEvent};
use stepflow::flows::echo_flow;
use stepflow::observability::init_tracing;

const REPLY: &str = "42";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(false);

    let handle = echo_flow()?.run(Event::start())?;
    let mut events = handle.stream_events()?;

    while let Some(event) = events.next().await {
        if event.is_a::<InputRequiredEvent>() {
            let request: InputRequiredEvent = event.to_typed()?;
            println!("{}{REPLY}", request.prefix);
            handle.send_event(HumanResponseEvent::new(REPLY).into_event()?)?;
        }
    }

    let result = handle.await?;
    println!("{}", result.as_str().unwrap_or_default());
    Ok(())
}
