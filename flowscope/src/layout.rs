//! Layered top-to-bottom graph layout.
//!
//! Nodes are placed in rows by topological rank with a fixed bounding box per
//! node and configurable spacing. The computation is deterministic for a
//! fixed node/edge ordering, runs wholesale on every graph reload, and
//! tolerates cycles and disconnected components.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use flowscope_types::{GraphLayout, GraphModel, LayoutNode, Position};

#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub node_width: f32,
    pub node_height: f32,
    /// Vertical gap between ranks.
    pub rank_gap: f32,
    /// Horizontal gap between nodes within a rank.
    pub node_gap: f32,
    pub padding: f32,
    /// Quiet window before the viewport refit request is released, so rapid
    /// successive graph loads collapse into one refit.
    pub fit_debounce: Duration,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            node_width: 188.0,
            node_height: 66.0,
            rank_gap: 92.0,
            node_gap: 20.0,
            padding: 22.0,
            fit_debounce: Duration::from_millis(150),
        }
    }
}

/// Owns the spacing parameters and the pending viewport-refit directive.
#[derive(Debug)]
pub struct LayoutEngine {
    options: LayoutOptions,
    last_layout: Option<Instant>,
    fit_pending: bool,
}

impl LayoutEngine {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            options,
            last_layout: None,
            fit_pending: false,
        }
    }

    /// Compute a fresh layout and arm the viewport refit request.
    pub fn layout(&mut self, graph: &GraphModel) -> GraphLayout {
        let layout = compute_layout(graph, &self.options);
        self.fit_pending = true;
        self.last_layout = Some(Instant::now());
        layout
    }

    /// True exactly once per settled layout: the refit fires after the
    /// debounce window has passed with no further layout.
    pub fn take_fit_request(&mut self) -> bool {
        if !self.fit_pending {
            return false;
        }
        let settled = self
            .last_layout
            .is_some_and(|at| at.elapsed() >= self.options.fit_debounce);
        if settled {
            self.fit_pending = false;
        }
        settled
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutOptions::default())
    }
}

/// Topological rank per node, in node order. A Kahn pass covers the acyclic
/// part; nodes left over by cycles get one past their highest ranked
/// predecessor, in canonical order, which breaks the cycle deterministically.
fn compute_ranks(graph: &GraphModel) -> Vec<usize> {
    let count = graph.nodes.len();
    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(count);
    for (idx, node) in graph.nodes.iter().enumerate() {
        index_of.entry(node.id.as_str()).or_insert(idx);
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut indegree = vec![0usize; count];
    for edge in &graph.edges {
        let (Some(&from), Some(&to)) = (
            index_of.get(edge.source.as_str()),
            index_of.get(edge.target.as_str()),
        ) else {
            continue;
        };
        successors[from].push(to);
        predecessors[to].push(from);
        indegree[to] += 1;
    }

    let mut rank = vec![0usize; count];
    let mut ranked = vec![false; count];
    let mut queue: VecDeque<usize> = (0..count).filter(|&idx| indegree[idx] == 0).collect();

    while let Some(idx) = queue.pop_front() {
        ranked[idx] = true;
        for &succ in &successors[idx] {
            rank[succ] = rank[succ].max(rank[idx] + 1);
            indegree[succ] -= 1;
            if indegree[succ] == 0 {
                queue.push_back(succ);
            }
        }
    }

    for idx in 0..count {
        if ranked[idx] {
            continue;
        }
        rank[idx] = predecessors[idx]
            .iter()
            .filter(|&&pred| ranked[pred])
            .map(|&pred| rank[pred] + 1)
            .max()
            .unwrap_or(0);
        ranked[idx] = true;
    }

    rank
}

fn compute_layout(graph: &GraphModel, options: &LayoutOptions) -> GraphLayout {
    let ranks = compute_ranks(graph);
    let row_count = ranks.iter().map(|r| r + 1).max().unwrap_or(0);

    let mut rows: Vec<Vec<usize>> = vec![Vec::new(); row_count];
    for (idx, &rank) in ranks.iter().enumerate() {
        rows[rank].push(idx);
    }

    let max_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let width = options.padding * 2.0
        + max_cols as f32 * options.node_width
        + max_cols.saturating_sub(1) as f32 * options.node_gap;
    let height = options.padding * 2.0
        + row_count as f32 * options.node_height
        + row_count.saturating_sub(1) as f32 * options.rank_gap;

    let mut positions = vec![
        Position { x: 0.0, y: 0.0 };
        graph.nodes.len()
    ];
    for (row_idx, row) in rows.iter().enumerate() {
        let y = options.padding + row_idx as f32 * (options.node_height + options.rank_gap);
        let row_width = row.len() as f32 * options.node_width
            + row.len().saturating_sub(1) as f32 * options.node_gap;
        let start_x = (width - row_width) / 2.0;
        for (col_idx, &node_idx) in row.iter().enumerate() {
            positions[node_idx] = Position {
                x: start_x + col_idx as f32 * (options.node_width + options.node_gap),
                y,
            };
        }
    }

    GraphLayout {
        width,
        height,
        nodes: graph
            .nodes
            .iter()
            .zip(positions)
            .map(|(node, position)| LayoutNode {
                node: node.clone(),
                position,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::normalize;
    use serde_json::json;

    fn engine_no_debounce() -> LayoutEngine {
        LayoutEngine::new(LayoutOptions {
            fit_debounce: Duration::ZERO,
            ..LayoutOptions::default()
        })
    }

    #[test]
    fn target_laid_out_strictly_below_source() {
        let model = normalize(
            &json!({"A": {}, "B": {}}),
            &json!([{"source": "A", "target": "B"}]),
        );
        let layout = engine_no_debounce().layout(&model);
        let a = layout.position_of(&"A".into()).unwrap();
        let b = layout.position_of(&"B".into()).unwrap();
        assert!(b.y > a.y);
    }

    #[test]
    fn layout_is_deterministic() {
        let model = normalize(
            &json!([{"id": "a"}, {"id": "b"}, {"id": "c"}, {"id": "d"}]),
            &json!([
                {"source": "a", "target": "b"},
                {"source": "a", "target": "c"},
                {"source": "b", "target": "d"},
                {"source": "c", "target": "d"}
            ]),
        );
        let first = engine_no_debounce().layout(&model);
        let second = engine_no_debounce().layout(&model);
        assert_eq!(first, second);
    }

    #[test]
    fn cycles_do_not_crash() {
        let model = normalize(
            &json!([{"id": "a"}, {"id": "b"}]),
            &json!([
                {"source": "a", "target": "b"},
                {"source": "b", "target": "a"}
            ]),
        );
        let layout = engine_no_debounce().layout(&model);
        assert_eq!(layout.nodes.len(), 2);
    }

    #[test]
    fn disconnected_components_share_ranks() {
        let model = normalize(
            &json!([{"id": "a"}, {"id": "b"}, {"id": "x"}]),
            &json!([{"source": "a", "target": "b"}]),
        );
        let layout = engine_no_debounce().layout(&model);
        let a = layout.position_of(&"a".into()).unwrap();
        let x = layout.position_of(&"x".into()).unwrap();
        assert_eq!(a.y, x.y);
    }

    #[test]
    fn empty_graph_produces_empty_layout() {
        let layout = engine_no_debounce().layout(&GraphModel::default());
        assert!(layout.nodes.is_empty());
    }

    #[test]
    fn fit_request_fires_once_per_layout() {
        let mut engine = engine_no_debounce();
        assert!(!engine.take_fit_request());

        let model = normalize(&json!([{"id": "a"}]), &json!([]));
        engine.layout(&model);
        assert!(engine.take_fit_request());
        assert!(!engine.take_fit_request());
    }

    #[test]
    fn rapid_reloads_collapse_into_one_fit() {
        let mut engine = LayoutEngine::new(LayoutOptions {
            fit_debounce: Duration::from_secs(60),
            ..LayoutOptions::default()
        });
        let model = normalize(&json!([{"id": "a"}]), &json!([]));
        engine.layout(&model);
        engine.layout(&model);
        // Debounce window still open: nothing released yet.
        assert!(!engine.take_fit_request());
    }
}
