//! Graph normalization: raw node/edge descriptions into a canonical
//! [`GraphModel`].
//!
//! The execution service describes nodes either as an ordered list of
//! `{id, name?}` objects or as a mapping from id to `{name?}`. Coercion is
//! best-effort: malformed entries are skipped, absent fields default to
//! empty, and nothing here ever errors.

use std::collections::HashSet;

use serde_json::Value;

use flowscope_types::{GraphEdge, GraphModel, GraphNode, GraphResponse, NodeId};

/// Ids carrying this substring mark internal/synthetic nodes.
const VIRTUAL_MARKER: &str = "__";

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn node_label(id: &str, body: &Value) -> String {
    body.get("name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| id.to_string())
}

fn build_node(id: String, body: &Value) -> GraphNode {
    let label = node_label(&id, body);
    let is_virtual = id.contains(VIRTUAL_MARKER);
    GraphNode {
        id: NodeId(id),
        label,
        is_virtual,
    }
}

fn collect_nodes(nodes: &Value) -> Vec<GraphNode> {
    match nodes {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(_) => item
                    .get("id")
                    .and_then(value_to_id)
                    .map(|id| build_node(id, item)),
                other => value_to_id(other).map(|id| build_node(id, &Value::Null)),
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(id, body)| build_node(id.clone(), body))
            .collect(),
        _ => Vec::new(),
    }
}

fn collect_edges(edges: &Value, known: &HashSet<&str>) -> Vec<GraphEdge> {
    let Value::Array(items) = edges else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let source = item.get("source").and_then(value_to_id)?;
            let target = item.get("target").and_then(value_to_id)?;
            if !known.contains(source.as_str()) || !known.contains(target.as_str()) {
                tracing::debug!(%source, %target, "dropping edge with unknown endpoint");
                return None;
            }
            Some(GraphEdge {
                source: NodeId(source),
                target: NodeId(target),
            })
        })
        .collect()
}

/// Normalize a raw graph description. Edges referencing unknown node ids are
/// silently filtered so the layout always receives a closed graph.
pub fn normalize(nodes: &Value, edges: &Value) -> GraphModel {
    let nodes = collect_nodes(nodes);
    let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let edges = collect_edges(edges, &known);
    GraphModel { nodes, edges }
}

/// Normalize the `GET /graph` response body.
pub fn normalize_response(response: &GraphResponse) -> GraphModel {
    normalize(&response.nodes, &response.edges)
}
