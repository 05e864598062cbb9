//! Terminal formatting of trace steps and the laid-out graph. Display
//! chrome only; all state it reads is owned by the controller and layout.

use flowscope_types::{GraphLayout, LayoutNode, NodeId, Payload, StepRole, TraceStep};

use crate::classify::pretty_json;
use crate::config::DisplayMode;
use crate::markdown;

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_payload(payload: &Payload, mode: DisplayMode) -> String {
    match payload {
        Payload::Messages(messages) => messages
            .iter()
            .map(|message| indent(&message.content, "  | "))
            .collect::<Vec<_>>()
            .join("\n"),
        Payload::Text(text) => {
            let rendered = match mode {
                DisplayMode::Clean => markdown::render_to_text(text),
                DisplayMode::Raw => text.clone(),
            };
            indent(&rendered, "  ")
        }
        Payload::Data(value) => indent(&pretty_json(value), "  "),
    }
}

pub fn format_step(index: usize, step: &TraceStep, mode: DisplayMode) -> String {
    let who = match step.role {
        StepRole::User => "user".to_string(),
        StepRole::Node => step.node_id.to_string(),
    };
    let mut out = format!("[{index}] {who}");
    for (channel, payload) in &step.payloads {
        out.push_str(&format!("\n {channel}:\n"));
        out.push_str(&format_payload(payload, mode));
    }
    out
}

/// Rows top to bottom, nodes left to right. The active node is marked with
/// `*`; virtual nodes render in parentheses (dimmed). An active id absent
/// from the layout simply marks nothing.
pub fn format_graph(layout: &GraphLayout, active: Option<&NodeId>) -> String {
    let mut rows: Vec<(f32, Vec<&LayoutNode>)> = Vec::new();
    for ln in &layout.nodes {
        match rows.iter_mut().find(|(y, _)| *y == ln.position.y) {
            Some((_, row)) => row.push(ln),
            None => rows.push((ln.position.y, vec![ln])),
        }
    }
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut lines = Vec::new();
    for (_, mut row) in rows {
        row.sort_by(|a, b| a.position.x.total_cmp(&b.position.x));
        let line = row
            .iter()
            .map(|ln| {
                let mark = if active == Some(&ln.node.id) { "*" } else { "" };
                if ln.node.is_virtual {
                    format!("({mark}{})", ln.node.label)
                } else {
                    format!("[{mark}{}]", ln.node.label)
                }
            })
            .collect::<Vec<_>>()
            .join("   ");
        lines.push(line);
    }
    lines.join("\n    |\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::normalize;
    use crate::layout::LayoutEngine;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn active_node_is_marked() {
        let model = normalize(
            &json!({"A": {}, "B": {}}),
            &json!([{"source": "A", "target": "B"}]),
        );
        let layout = LayoutEngine::default().layout(&model);
        let text = format_graph(&layout, Some(&"B".into()));
        assert!(text.contains("[*B]"));
        assert!(text.contains("[A]"));
    }

    #[test]
    fn unknown_active_node_marks_nothing() {
        let model = normalize(&json!({"A": {}}), &json!([]));
        let layout = LayoutEngine::default().layout(&model);
        let text = format_graph(&layout, Some(&"ghost".into()));
        assert!(!text.contains('*'));
    }

    #[test]
    fn virtual_nodes_render_dimmed() {
        let model = normalize(&json!([{"id": "__start__"}]), &json!([]));
        let layout = LayoutEngine::default().layout(&model);
        assert!(format_graph(&layout, None).contains("(__start__)"));
    }

    #[test]
    fn raw_mode_keeps_text_verbatim() {
        let mut payloads = BTreeMap::new();
        payloads.insert(
            "output".to_string(),
            Payload::Text("**bold**".to_string()),
        );
        let step = TraceStep {
            node_id: "plan".into(),
            role: StepRole::Node,
            payloads,
        };
        assert!(format_step(0, &step, DisplayMode::Raw).contains("**bold**"));
        assert!(!format_step(0, &step, DisplayMode::Clean).contains("**"));
    }
}
