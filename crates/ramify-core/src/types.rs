//! Shared types used across the Ramify crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A 2D layout coordinate. Advisory only — owned by presentation, the core
/// never reads it back for anything but re-serialization and child
/// placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// A concept vertex as stored in a session. The id is immutable for the
/// life of the node; label and content may be overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub label: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Display tag for the frontend renderer. No core semantics.
    #[serde(default = "mindmap_kind")]
    pub kind: String,
}

impl NodeInfo {
    pub fn new(id: impl Into<String>, label: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            content: content.into(),
            position: None,
            kind: mindmap_kind(),
        }
    }

    /// Set the layout position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// A directed parent→child relationship between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Display tag, like [`NodeInfo::kind`].
    #[serde(default = "mindmap_kind")]
    pub kind: String,
}

impl EdgeInfo {
    /// Create a parent→child edge with the conventional `e-{src}-{dst}` id.
    pub fn between(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("e-{}-{}", source, target),
            source,
            target,
            kind: mindmap_kind(),
        }
    }
}

fn mindmap_kind() -> String {
    "mindmap".to_string()
}

/// A node as produced by the content generator, before layout and session
/// commit. `parent_id` is `None` only for the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedNode {
    pub id: String,
    pub label: String,
    pub content: String,
    pub parent_id: Option<String>,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message in a node's tutor chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: now,
        }
    }
}

/// Chat transcript attached to one node, in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistory {
    pub node_id: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatHistory {
    pub fn new(node_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            node_id: node_id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.updated_at = message.created_at;
        self.messages.push(message);
    }
}
