//! Static diagrams of every path a workflow can take.

use super::Workflow;
use crate::core::EventTag;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

/// Kind of a diagram node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeKind {
    /// A registered step.
    Step,
    /// An event tag.
    Event,
    /// The terminal `stop` tag.
    Stop,
    /// The `input_required` tag, which hands control to a human.
    External,
}

/// A node of the flow diagram.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FlowNode {
    /// Mermaid-safe identifier.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Node kind.
    pub kind: NodeKind,
}

/// The graph of all possible flows, derived from step registrations.
///
/// Every accepted tag points at its consumer and every step points at the
/// tags it declares. No run is needed to build it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowDiagram {
    title: String,
    nodes: BTreeSet<FlowNode>,
    edges: BTreeSet<(String, String)>,
}

impl FlowDiagram {
    /// Builds the diagram of a workflow.
    #[must_use]
    pub fn from_workflow(workflow: &Workflow) -> Self {
        let mut diagram = Self {
            title: workflow.name().to_string(),
            nodes: BTreeSet::new(),
            edges: BTreeSet::new(),
        };

        for step in workflow.steps() {
            let step_id = format!("step_{}", sanitize(step.name()));
            diagram.nodes.insert(FlowNode {
                id: step_id.clone(),
                label: step.name().to_string(),
                kind: NodeKind::Step,
            });

            let accepts = step.accepts();
            let accepts_id = diagram.add_event(&accepts);
            diagram.edges.insert((accepts_id, step_id.clone()));

            for tag in step.emits() {
                let tag_id = diagram.add_event(&tag);
                diagram.edges.insert((step_id.clone(), tag_id));
            }
        }

        // A human reply re-enters the workflow after an input request.
        let human = EventTag::new(EventTag::HUMAN_RESPONSE);
        let input = EventTag::new(EventTag::INPUT_REQUIRED);
        if workflow.consumer_of(EventTag::HUMAN_RESPONSE).is_some()
            && diagram.nodes.iter().any(|n| n.kind == NodeKind::External)
        {
            diagram
                .edges
                .insert((event_id(&input), event_id(&human)));
        }

        diagram
    }

    fn add_event(&mut self, tag: &EventTag) -> String {
        let id = event_id(tag);
        let kind = if tag.is_terminal() {
            NodeKind::Stop
        } else if tag.is_input_required() {
            NodeKind::External
        } else {
            NodeKind::Event
        };
        self.nodes.insert(FlowNode {
            id: id.clone(),
            label: tag.to_string(),
            kind,
        });
        id
    }

    /// Returns the diagram title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &FlowNode> {
        self.nodes.iter()
    }

    /// Returns all edges as `(from, to)` node ids.
    pub fn edges(&self) -> impl Iterator<Item = &(String, String)> {
        self.edges.iter()
    }

    /// Renders the diagram as a Mermaid flowchart.
    #[must_use]
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");
        for node in &self.nodes {
            let line = match node.kind {
                NodeKind::Step => format!("    {}[\"{}\"]", node.id, node.label),
                NodeKind::Event => format!("    {}([\"{}\"])", node.id, node.label),
                NodeKind::Stop => format!("    {}((\"{}\"))", node.id, node.label),
                NodeKind::External => format!("    {}{{{{\"{}\"}}}}", node.id, node.label),
            };
            let _ = writeln!(out, "{line}");
        }
        for (from, to) in &self.edges {
            let _ = writeln!(out, "    {from} --> {to}");
        }
        out
    }

    /// Renders a standalone HTML page showing the diagram.
    #[must_use]
    pub fn to_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
             <script type=\"module\">\n\
             import mermaid from 'https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.esm.min.mjs';\n\
             mermaid.initialize({{ startOnLoad: true }});\n\
             </script>\n</head>\n<body>\n<h1>{title}</h1>\n<pre class=\"mermaid\">\n{body}</pre>\n</body>\n</html>\n",
            title = html_escape(&self.title),
            body = html_escape(&self.to_mermaid()),
        )
    }

    /// Writes the HTML page to `path`, creating parent directories.
    pub fn write_html(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_html())
    }
}

fn event_id(tag: &EventTag) -> String {
    format!("event_{}", sanitize(tag.as_str()))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
