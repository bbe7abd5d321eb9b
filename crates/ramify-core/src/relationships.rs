//! The relationship index and the unlock predicate.
//!
//! The index is derived from the edge list and never edited directly: it is
//! rebuilt (or incrementally extended) whenever edges change, so readers
//! always see adjacency that matches the current edges.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::status::NodeState;
use crate::types::EdgeInfo;

/// Parents-of and children-of adjacency maps derived from a flat edge list.
///
/// Every id that appears on either side of any edge gets an entry in both
/// maps, so lookups for known ids never need null checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipIndex {
    pub parents: HashMap<String, HashSet<String>>,
    pub children: HashMap<String, HashSet<String>>,
}

impl RelationshipIndex {
    /// Build the index from scratch. Pure, O(E), idempotent. Edges with an
    /// empty source/target or a self-loop are skipped as malformed input.
    pub fn build(edges: &[EdgeInfo]) -> Self {
        let mut index = Self::default();
        for edge in edges {
            index.insert(edge);
        }
        index
    }

    /// Incrementally fold one edge into the index. Malformed edges are
    /// skipped with a warning, matching [`RelationshipIndex::build`].
    pub fn insert(&mut self, edge: &EdgeInfo) {
        if edge.source.is_empty() || edge.target.is_empty() {
            warn!(edge = %edge.id, "skipping edge with missing source or target");
            return;
        }
        if edge.source == edge.target {
            warn!(edge = %edge.id, "skipping self-loop edge");
            return;
        }
        self.parents.entry(edge.source.clone()).or_default();
        self.children.entry(edge.target.clone()).or_default();
        self.parents
            .entry(edge.target.clone())
            .or_default()
            .insert(edge.source.clone());
        self.children
            .entry(edge.source.clone())
            .or_default()
            .insert(edge.target.clone());
    }

    /// Ids with an edge pointing into `id`. Empty for roots and unknown ids.
    pub fn parents_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a String> + 'a {
        self.parents.get(id).into_iter().flatten()
    }

    /// Ids reachable via `id`'s outgoing edges. Empty for leaves and unknown
    /// ids.
    pub fn children_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a String> + 'a {
        self.children.get(id).into_iter().flatten()
    }
}

/// Which related nodes must be completed before a node unlocks.
///
/// Two historically inconsistent rules exist in deployments of this kind of
/// tool; both are supported and one is chosen per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockRule {
    /// Unlockable iff every parent is completed. A root (no parents) is
    /// trivially unlockable. This is the canonical default.
    ParentsComplete,
    /// Unlockable iff every child is completed. A leaf (no children) is
    /// trivially unlockable.
    ChildrenComplete,
}

impl Default for UnlockRule {
    fn default() -> Self {
        UnlockRule::ParentsComplete
    }
}

/// Result of evaluating the unlock predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockCheck {
    pub unlockable: bool,
    /// The related node ids still blocking the unlock, for "what's left"
    /// messaging.
    pub pending: Vec<String>,
}

/// Evaluate the unlock predicate for one node against current statuses.
///
/// Pure: the cached `unlockable` flag on the node's progress record is the
/// caller's to update. Nodes without a recorded status count as pending.
pub fn check_unlockable<F>(
    node_id: &str,
    rule: UnlockRule,
    index: &RelationshipIndex,
    state_of: F,
) -> UnlockCheck
where
    F: Fn(&str) -> Option<NodeState>,
{
    let related: Vec<&String> = match rule {
        UnlockRule::ParentsComplete => index.parents_of(node_id).collect(),
        UnlockRule::ChildrenComplete => index.children_of(node_id).collect(),
    };

    let mut pending: Vec<String> = related
        .into_iter()
        .filter(|id| state_of(id) != Some(NodeState::Completed))
        .cloned()
        .collect();
    pending.sort();

    UnlockCheck {
        unlockable: pending.is_empty(),
        pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges() -> Vec<EdgeInfo> {
        vec![EdgeInfo::between("A", "B"), EdgeInfo::between("A", "C")]
    }

    #[test]
    fn build_derives_both_maps() {
        let index = RelationshipIndex::build(&edges());
        assert_eq!(
            index.children["A"],
            HashSet::from(["B".to_string(), "C".to_string()])
        );
        assert_eq!(index.parents["B"], HashSet::from(["A".to_string()]));
        assert_eq!(index.parents["C"], HashSet::from(["A".to_string()]));
        // Every id seen in any edge has entries in both maps.
        assert!(index.parents["A"].is_empty());
        assert!(index.children["B"].is_empty());
        assert!(index.children["C"].is_empty());
    }

    #[test]
    fn build_is_idempotent() {
        let edges = edges();
        let first = RelationshipIndex::build(&edges);
        let second = RelationshipIndex::build(&edges);
        assert_eq!(first.parents, second.parents);
        assert_eq!(first.children, second.children);
    }

    #[test]
    fn malformed_edges_are_skipped() {
        let mut edges = edges();
        edges.push(EdgeInfo {
            id: "e-broken".into(),
            source: String::new(),
            target: "B".into(),
            kind: "mindmap".into(),
        });
        edges.push(EdgeInfo::between("B", "B"));
        let index = RelationshipIndex::build(&edges);
        assert_eq!(index.parents["B"], HashSet::from(["A".to_string()]));
        assert!(index.children["B"].is_empty());
    }

    #[test]
    fn root_is_unlockable_under_parents_rule() {
        let index = RelationshipIndex::build(&edges());
        let check = check_unlockable("A", UnlockRule::ParentsComplete, &index, |_| None);
        assert!(check.unlockable);
        assert!(check.pending.is_empty());
    }

    #[test]
    fn leaf_is_unlockable_under_children_rule() {
        let index = RelationshipIndex::build(&edges());
        let check = check_unlockable("B", UnlockRule::ChildrenComplete, &index, |_| None);
        assert!(check.unlockable);
    }

    #[test]
    fn pending_ids_are_reported() {
        let index = RelationshipIndex::build(&edges());
        let check = check_unlockable("A", UnlockRule::ChildrenComplete, &index, |id| {
            if id == "B" {
                Some(NodeState::Completed)
            } else {
                Some(NodeState::NotStarted)
            }
        });
        assert!(!check.unlockable);
        assert_eq!(check.pending, vec!["C".to_string()]);
    }

    #[test]
    fn all_children_completed_unlocks_parent() {
        let index = RelationshipIndex::build(&edges());
        let check = check_unlockable("A", UnlockRule::ChildrenComplete, &index, |_| {
            Some(NodeState::Completed)
        });
        assert!(check.unlockable);
        assert!(check.pending.is_empty());
    }

    #[test]
    fn multi_parent_nodes_are_handled() {
        // DAG shape: D has two parents.
        let edges = vec![EdgeInfo::between("A", "D"), EdgeInfo::between("B", "D")];
        let index = RelationshipIndex::build(&edges);
        let check = check_unlockable("D", UnlockRule::ParentsComplete, &index, |id| {
            if id == "A" {
                Some(NodeState::Completed)
            } else {
                Some(NodeState::InProgress)
            }
        });
        assert!(!check.unlockable);
        assert_eq!(check.pending, vec!["B".to_string()]);
    }
}
