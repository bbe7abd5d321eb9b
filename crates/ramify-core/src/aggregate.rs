//! The session aggregate — the per-learner consistency boundary.
//!
//! All mutations are scoped to one aggregate. The relationship index is kept
//! in lockstep with the edge list: bulk installs rebuild it, single-edge
//! appends extend it, and nothing else touches it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{RamifyError, Result};
use crate::relationships::RelationshipIndex;
use crate::status::{NodeProgress, NodeState};
use crate::types::{ChatHistory, EdgeInfo, NodeInfo};

/// Everything one learner session owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionAggregate {
    /// Concept vertices by id.
    pub nodes: HashMap<String, NodeInfo>,
    /// Progress records by node id. May be staged before the matching node
    /// info arrives; reads for missing nodes report not-found, never panic.
    pub progress: HashMap<String, NodeProgress>,
    pub edges: Vec<EdgeInfo>,
    pub relationships: RelationshipIndex,
    /// Tutor chat transcripts by node id.
    pub chats: HashMap<String, ChatHistory>,
}

/// A node's info joined with its progress and related-node info, as served
/// by the node-data read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    pub node: NodeInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<NodeProgress>,
    pub parents: Vec<NodeInfo>,
    pub children: Vec<NodeInfo>,
}

impl SessionAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk graph install: upsert node infos, seed progress for ids that
    /// have none, replace the edge list, and rebuild the index. Existing
    /// progress for already-known ids is preserved.
    pub fn install_graph(&mut self, nodes: Vec<(NodeInfo, NodeState)>, edges: Vec<EdgeInfo>) {
        for (info, state) in nodes {
            let id = info.id.clone();
            self.nodes.insert(id.clone(), info);
            self.progress
                .entry(id.clone())
                .or_insert_with(|| NodeProgress::new(id, state));
        }
        self.edges = edges;
        self.relationships = RelationshipIndex::build(&self.edges);
    }

    /// Add a single node with its initial state, preserving any progress
    /// already staged for the id.
    pub fn add_node(&mut self, info: NodeInfo, state: NodeState) {
        let id = info.id.clone();
        self.nodes.insert(id.clone(), info);
        self.progress
            .entry(id.clone())
            .or_insert_with(|| NodeProgress::new(id, state));
    }

    /// Append one edge and extend the index in the same step. Duplicate ids
    /// are ignored; malformed edges are rejected before any mutation.
    pub fn add_edge(&mut self, edge: EdgeInfo) -> Result<()> {
        if edge.source.is_empty() || edge.target.is_empty() {
            return Err(RamifyError::MalformedEdge(format!(
                "{}: missing source or target",
                edge.id
            )));
        }
        if edge.source == edge.target {
            return Err(RamifyError::MalformedEdge(format!(
                "{}: self-loop {}",
                edge.id, edge.source
            )));
        }
        if self.edges.iter().any(|e| e.id == edge.id) {
            return Ok(());
        }
        self.relationships.insert(&edge);
        self.edges.push(edge);
        Ok(())
    }

    pub fn node_info(&self, node_id: &str) -> Result<&NodeInfo> {
        self.nodes
            .get(node_id)
            .ok_or_else(|| RamifyError::node_not_found(node_id))
    }

    pub fn progress_mut(&mut self, node_id: &str) -> Result<&mut NodeProgress> {
        self.progress
            .get_mut(node_id)
            .ok_or_else(|| RamifyError::node_not_found(node_id))
    }

    /// Current lifecycle state of a node, if any progress is recorded.
    pub fn state_of(&self, node_id: &str) -> Option<NodeState> {
        self.progress.get(node_id).map(|p| p.state)
    }

    /// Node info joined with progress and parent/child info lists.
    pub fn node_view(&self, node_id: &str) -> Result<NodeView> {
        let node = self.node_info(node_id)?.clone();
        let progress = self.progress.get(node_id).cloned();
        let mut parents: Vec<NodeInfo> = self
            .relationships
            .parents_of(node_id)
            .filter_map(|id| self.nodes.get(id))
            .cloned()
            .collect();
        let mut children: Vec<NodeInfo> = self
            .relationships
            .children_of(node_id)
            .filter_map(|id| self.nodes.get(id))
            .cloned()
            .collect();
        parents.sort_by(|a, b| a.id.cmp(&b.id));
        children.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(NodeView {
            node,
            progress,
            parents,
            children,
        })
    }
}
