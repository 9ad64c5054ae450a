//! Renders every possible path through the calculator flow to HTML.
//!
//! Nothing is run, so the scripted client never gets a request.

use std::path::PathBuf;
use std::sync::Arc;

use stepflow::flows::calculator_flow;
use stepflow::llm::ScriptedLlm;
use stepflow::workflow::FlowDiagram;

fn main() -> anyhow::Result<()> {
    let workflow = calculator_flow(Arc::new(ScriptedLlm::new(Vec::<String>::new())))?;

    let output_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("output");
    std::fs::create_dir_all(&output_dir)?;
    let output_file = output_dir.join("workflow_diagram.html");

    println!("Generating workflow diagram...");
    let diagram = FlowDiagram::from_workflow(&workflow);
    diagram.write_html(&output_file)?;

    println!("{}", diagram.to_mermaid());
    println!("[OK] Saved to: {}", output_file.display());
    Ok(())
}
