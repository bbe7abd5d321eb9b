//! Breadth-first mind-map generation.
//!
//! The generator expands a topic level by level: one structured call for the
//! root, then one per frontier node until `max_depth`. Generation never
//! fails as a whole — a failed root falls back to a deterministic default,
//! and a node whose expansion exhausts its retries simply stays a leaf while
//! its siblings continue.

use ramify_core::types::GeneratedNode;
use ramify_llm::{
    child_nodes_tool, mindmap_tool, ChildNodesPrompt, LlmBackend, LlmError, LlmResult,
    PromptTemplate, RootNodePrompt, ToolSpec,
};
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{info, warn};

/// Id given to the root node (and requested from the model).
pub const ROOT_ID: &str = "1";

/// Limits for tree generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Maximum tree depth; the root counts as depth 1.
    pub max_depth: usize,
    /// Maximum children requested per expansion.
    pub max_children: usize,
    /// Extra attempts after a failed or empty expansion.
    pub max_retries: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_children: 4,
            max_retries: 2,
        }
    }
}

impl GeneratorConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn with_max_children(mut self, max_children: usize) -> Self {
        self.max_children = max_children.max(1);
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Node list as returned through the tool schema. Fields are optional here
/// so one malformed entry degrades to defaults instead of sinking the batch.
#[derive(Debug, Deserialize)]
struct ToolNodes {
    #[serde(default)]
    nodes: Vec<RawNode>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    parent_id: Option<String>,
}

/// Builds mind-map trees through an injected LLM backend.
pub struct MindmapGenerator {
    backend: Arc<dyn LlmBackend>,
    config: GeneratorConfig,
}

impl MindmapGenerator {
    pub fn new(backend: Arc<dyn LlmBackend>, config: GeneratorConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the root node for a topic. Any upstream failure yields the
    /// deterministic fallback root — this call never errors.
    pub async fn generate_root(&self, topic: &str) -> GeneratedNode {
        let prompt = RootNodePrompt::new(topic);
        let raw = self
            .request_nodes(&prompt.generate(), prompt.system_prompt().as_deref(), &mindmap_tool())
            .await;

        match raw.and_then(|mut nodes| {
            if nodes.is_empty() {
                None
            } else {
                Some(nodes.remove(0))
            }
        }) {
            Some(node) => GeneratedNode {
                id: non_empty(node.id).unwrap_or_else(|| ROOT_ID.to_string()),
                label: non_empty(node.label).unwrap_or_else(|| topic.to_string()),
                content: non_empty(node.content)
                    .unwrap_or_else(|| fallback_root_content(topic)),
                parent_id: None,
            },
            None => {
                warn!(topic, "no root node from the model, using fallback root");
                fallback_root(topic)
            }
        }
    }

    /// One child-generation call for a parent node. Returns an empty vec
    /// when the provider produced no structured payload; errors are left to
    /// the retry wrapper.
    pub async fn generate_children(
        &self,
        parent: &GeneratedNode,
        max_children: usize,
        used_ids: &HashSet<String>,
    ) -> LlmResult<Vec<GeneratedNode>> {
        let prompt = ChildNodesPrompt::new(&parent.id, &parent.label, &parent.content, max_children);
        let payload = self
            .backend
            .generate_structured(
                &prompt.generate(),
                &child_nodes_tool(),
                prompt.system_prompt().as_deref(),
            )
            .await?;

        let Some(value) = payload else {
            return Ok(Vec::new());
        };
        let parsed: ToolNodes =
            serde_json::from_value(value).map_err(|e| LlmError::ParseError(e.to_string()))?;

        let mut nodes = parsed.nodes;
        nodes.truncate(max_children);
        Ok(sanitize_children(parent, nodes, used_ids))
    }

    /// Child generation with the bounded retry policy: the first attempt
    /// plus up to `max_retries` more when the call errors or comes back
    /// empty. Exhaustion yields zero children, never an error.
    pub async fn expand_with_retry(
        &self,
        parent: &GeneratedNode,
        max_children: usize,
        used_ids: &HashSet<String>,
    ) -> Vec<GeneratedNode> {
        let attempts = self.config.max_retries + 1;
        for attempt in 1..=attempts {
            match self.generate_children(parent, max_children, used_ids).await {
                Ok(children) if !children.is_empty() => return children,
                Ok(_) => {
                    warn!(parent = %parent.id, attempt, "child generation returned no nodes");
                }
                Err(e) => {
                    warn!(parent = %parent.id, attempt, error = %e, "child generation failed");
                }
            }
        }
        warn!(parent = %parent.id, "exhausted child-generation retries, node stays a leaf");
        Vec::new()
    }

    /// Generate a full tree for a topic, breadth first, bounded by
    /// `max_depth`. Always returns at least the root node.
    pub async fn generate_tree(&self, topic: &str, max_depth: usize) -> Vec<GeneratedNode> {
        let max_depth = max_depth.max(1);
        info!(topic, max_depth, "starting mind-map generation");

        let root = self.generate_root(topic).await;
        let mut all = vec![root.clone()];
        let mut used_ids: HashSet<String> = HashSet::from([root.id.clone()]);
        let mut queue: VecDeque<(GeneratedNode, usize)> = VecDeque::from([(root, 1)]);

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let children = self
                .expand_with_retry(&node, self.config.max_children, &used_ids)
                .await;
            for child in children {
                used_ids.insert(child.id.clone());
                all.push(child.clone());
                queue.push_back((child, depth + 1));
            }
        }

        info!(topic, nodes = all.len(), "mind-map generation complete");
        all
    }

    async fn request_nodes(
        &self,
        prompt: &str,
        system: Option<&str>,
        tool: &ToolSpec,
    ) -> Option<Vec<RawNode>> {
        match self.backend.generate_structured(prompt, tool, system).await {
            Ok(Some(value)) => match serde_json::from_value::<ToolNodes>(value) {
                Ok(parsed) => Some(parsed.nodes),
                Err(e) => {
                    warn!(error = %e, "structured payload did not match the node schema");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "structured generation failed");
                None
            }
        }
    }
}

/// The deterministic root used whenever the model cannot provide one.
pub fn fallback_root(topic: &str) -> GeneratedNode {
    GeneratedNode {
        id: ROOT_ID.to_string(),
        label: topic.to_string(),
        content: fallback_root_content(topic),
        parent_id: None,
    }
}

fn fallback_root_content(topic: &str) -> String {
    format!(
        "Overview of {}: a comprehensive exploration of this subject and its key aspects.",
        topic
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Normalize a batch of raw child nodes: suggested ids are kept when unique,
/// missing or colliding ids become `{parent_id}.{n}`, and the parent link is
/// forced to the requesting parent.
fn sanitize_children(
    parent: &GeneratedNode,
    raw: Vec<RawNode>,
    used_ids: &HashSet<String>,
) -> Vec<GeneratedNode> {
    let mut taken = used_ids.clone();
    let mut children = Vec::with_capacity(raw.len());

    for (n, node) in raw.into_iter().enumerate() {
        let suggested = non_empty(node.id).filter(|id| !taken.contains(id));
        let id = suggested.unwrap_or_else(|| {
            let mut ordinal = n + 1;
            loop {
                let candidate = format!("{}.{}", parent.id, ordinal);
                if !taken.contains(&candidate) {
                    break candidate;
                }
                ordinal += 1;
            }
        });
        taken.insert(id.clone());

        children.push(GeneratedNode {
            id,
            label: non_empty(node.label).unwrap_or_else(|| format!("Aspect of {}", parent.label)),
            content: non_empty(node.content)
                .unwrap_or_else(|| format!("A key component of {}.", parent.label)),
            parent_id: Some(parent.id.clone()),
        });
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> GeneratedNode {
        GeneratedNode {
            id: "1.2".to_string(),
            label: "Light reactions".to_string(),
            content: "The light-dependent stage.".to_string(),
            parent_id: Some("1".to_string()),
        }
    }

    fn raw(id: Option<&str>) -> RawNode {
        RawNode {
            id: id.map(str::to_string),
            label: Some("Child".to_string()),
            content: Some("Child content.".to_string()),
            parent_id: None,
        }
    }

    #[test]
    fn suggested_unique_ids_are_kept() {
        let children = sanitize_children(
            &parent(),
            vec![raw(Some("1.2.1")), raw(Some("1.2.2"))],
            &HashSet::new(),
        );
        assert_eq!(children[0].id, "1.2.1");
        assert_eq!(children[1].id, "1.2.2");
        assert_eq!(children[0].parent_id.as_deref(), Some("1.2"));
    }

    #[test]
    fn missing_and_duplicate_ids_are_synthesized() {
        let used = HashSet::from(["1.2.1".to_string()]);
        let children = sanitize_children(
            &parent(),
            vec![raw(None), raw(Some("1.2.1")), raw(Some("1.2.1"))],
            &used,
        );
        // First child: no id, ordinal 1 collides with the taken "1.2.1".
        assert_eq!(children[0].id, "1.2.2");
        // Suggested id already taken, ordinal 2 now taken too.
        assert_eq!(children[1].id, "1.2.3");
        assert_eq!(children[2].id, "1.2.4");
    }

    #[test]
    fn blank_fields_fall_back_to_parent_derived_text() {
        let children = sanitize_children(
            &parent(),
            vec![RawNode {
                id: Some("  ".to_string()),
                label: None,
                content: Some(String::new()),
                parent_id: None,
            }],
            &HashSet::new(),
        );
        assert_eq!(children[0].id, "1.2.1");
        assert!(children[0].label.contains("Light reactions"));
        assert!(!children[0].content.is_empty());
    }

    #[test]
    fn fallback_root_names_the_topic() {
        let root = fallback_root("Plate tectonics");
        assert_eq!(root.id, ROOT_ID);
        assert_eq!(root.label, "Plate tectonics");
        assert!(root.content.contains("Plate tectonics"));
        assert!(root.parent_id.is_none());
    }
}
