//! Initial layout for generated trees and placement for expanded children.
//!
//! Layout is derived after generation, not during it: depth comes from
//! walking `parent_id` links, nodes at the same depth are spread
//! horizontally, and depth adds a fixed vertical offset. On-demand child
//! expansion instead fans the new nodes out in a semicircle below the
//! parent, since only that one position is known.

use ramify_core::status::NodeState;
use ramify_core::types::{EdgeInfo, GeneratedNode, Position};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;

const LEVEL_SPACING_X: f64 = 250.0;
const LEVEL_SPACING_Y: f64 = 200.0;
const CHILD_RADIUS: f64 = 250.0;

/// A node with its assigned position and initial lifecycle state, as
/// returned by the create/expand operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedNode {
    pub id: String,
    pub label: String,
    pub content: String,
    pub position: Position,
    #[serde(rename = "status")]
    pub state: NodeState,
    #[serde(default = "mindmap_kind")]
    pub kind: String,
}

impl PlacedNode {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        content: impl Into<String>,
        position: Position,
        state: NodeState,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            content: content.into(),
            position,
            state,
            kind: mindmap_kind(),
        }
    }
}

fn mindmap_kind() -> String {
    "mindmap".to_string()
}

/// Positioned nodes plus the parent→child edges between them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<PlacedNode>,
    pub edges: Vec<EdgeInfo>,
}

/// Assign layered positions to a generated tree.
///
/// Nodes are grouped by depth; within one level they are spaced evenly and
/// centered, and each level steps down by a fixed offset. The root level
/// starts `not_started`, everything below `locked`.
pub fn layered_layout(nodes: &[GeneratedNode]) -> GraphSnapshot {
    let by_id: HashMap<&str, &GeneratedNode> =
        nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut levels: BTreeMap<usize, Vec<&GeneratedNode>> = BTreeMap::new();
    for node in nodes {
        levels.entry(depth_of(node, &by_id)).or_default().push(node);
    }

    let mut snapshot = GraphSnapshot::default();
    for (&depth, level_nodes) in &levels {
        let width = level_nodes.len() as f64;
        for (i, node) in level_nodes.iter().enumerate() {
            let position = Position::new(
                (i as f64 - width / 2.0) * LEVEL_SPACING_X,
                depth as f64 * LEVEL_SPACING_Y,
            );
            let state = if depth == 0 {
                NodeState::NotStarted
            } else {
                NodeState::Locked
            };
            snapshot
                .nodes
                .push(PlacedNode::new(&node.id, &node.label, &node.content, position, state));

            if let Some(parent_id) = &node.parent_id {
                snapshot.edges.push(EdgeInfo::between(parent_id, &node.id));
            }
        }
    }
    snapshot
}

/// Ancestor-chain length of a node, walking `parent_id` links. Bounded by
/// the node count so a malformed cyclic input terminates.
fn depth_of(node: &GeneratedNode, by_id: &HashMap<&str, &GeneratedNode>) -> usize {
    let mut depth = 0;
    let mut current = node.parent_id.as_deref();
    while let Some(parent_id) = current {
        depth += 1;
        if depth > by_id.len() {
            break;
        }
        current = by_id.get(parent_id).and_then(|p| p.parent_id.as_deref());
    }
    depth
}

/// Positions for `count` new children, swept across a semicircle below the
/// parent. A single child sits at the apex.
pub fn semicircle_positions(parent: Position, count: usize) -> Vec<Position> {
    (0..count)
        .map(|i| {
            let fraction = if count > 1 {
                i as f64 / (count - 1) as f64
            } else {
                0.5
            };
            let angle = PI * fraction;
            Position::new(
                parent.x + CHILD_RADIUS * angle.cos(),
                parent.y + LEVEL_SPACING_Y + CHILD_RADIUS * angle.sin() * 0.5,
            )
        })
        .collect()
}
