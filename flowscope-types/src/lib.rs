//! Shared types between the Flowscope engine core and its front ends.
//!
//! Everything here is serializable with serde: the same shapes travel over
//! HTTP to the execution service and into persisted thread history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Graph
// ============================================================================

/// Unique identifier for a graph node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A node of the static workflow topology. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,

    /// Display name; falls back to the id when the description has none.
    pub label: String,

    /// Internal/synthetic node, flagged by the double-underscore id
    /// convention. Rendered dimmed; carries no execution semantics.
    pub is_virtual: bool,
}

/// A directed edge between two existing nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
}

/// Canonical graph: ordered nodes plus edges whose endpoints all exist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphModel {
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|node| &node.id == id)
    }
}

// ============================================================================
// Layout
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// A graph node with its assigned 2-D position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutNode {
    pub node: GraphNode,
    pub position: Position,
}

/// Full layout output: one positioned node per graph node, plus the
/// bounding box the viewport should fit to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphLayout {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<LayoutNode>,
}

impl GraphLayout {
    pub fn position_of(&self, id: &NodeId) -> Option<Position> {
        self.nodes
            .iter()
            .find(|ln| &ln.node.id == id)
            .map(|ln| ln.position)
    }
}

// ============================================================================
// Trace
// ============================================================================

/// One completed unit of work reported by the execution service mid-stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEvent {
    /// Which node is reporting.
    pub node_id: NodeId,

    /// Named update channels and their raw payload values.
    pub updates: serde_json::Map<String, serde_json::Value>,
}

/// Who a trace step is attributed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepRole {
    User,
    Node,
}

/// One payload value classified into a renderable shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// An ordered message sequence; each item carried a `content` field.
    Messages(Vec<TraceMessage>),
    /// A plain string, rendered preformatted or through markdown.
    Text(String),
    /// Anything else, rendered as pretty-printed JSON.
    Data(serde_json::Value),
}

/// A single message extracted from a message-sequence payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceMessage {
    pub content: String,
}

/// The renderable record derived from one TraceEvent (or one user input).
/// Append-only and ordered by arrival; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceStep {
    pub node_id: NodeId,
    pub role: StepRole,
    pub payloads: BTreeMap<String, Payload>,
}

impl TraceStep {
    /// The synthetic step appended for a submitted user input.
    pub fn user(input: &str) -> Self {
        let mut payloads = BTreeMap::new();
        payloads.insert("input".to_string(), Payload::Text(input.to_string()));
        Self {
            node_id: NodeId("user".to_string()),
            role: StepRole::User,
            payloads,
        }
    }
}

// ============================================================================
// Threads
// ============================================================================

/// One persisted run, listed by the session store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadInfo {
    pub id: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Wire shapes
// ============================================================================

/// Response of `GET /graph`. Nodes and edges stay raw JSON here; the graph
/// module coerces them into a canonical [`GraphModel`] best-effort.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphResponse {
    #[serde(default)]
    pub nodes: serde_json::Value,
    #[serde(default)]
    pub edges: serde_json::Value,
    #[serde(default, rename = "isStateful")]
    pub is_stateful: bool,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub input: String,
    #[serde(rename = "threadId", skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}
