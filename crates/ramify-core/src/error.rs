//! Error types for Ramify operations.
//!
//! Upstream generation failures never appear here: the generator and the
//! assessment engine absorb those into deterministic fallback content, so
//! callers only ever see client-side conditions (unknown ids, invalid
//! status values, malformed edges) or genuine internal inconsistencies.

use std::error::Error;
use std::fmt;

/// Result type for Ramify operations.
pub type Result<T> = std::result::Result<T, RamifyError>;

/// Errors that can occur while operating on a session.
#[derive(Debug, Clone)]
pub enum RamifyError {
    /// Referenced node does not exist in the session.
    NodeNotFound(String),
    /// Referenced question does not exist on the node.
    QuestionNotFound(String),
    /// Status value outside the allowed set.
    InvalidStatus(String),
    /// Edge missing source/target or pointing at itself.
    MalformedEdge(String),
    /// Session state violates an internal invariant — a bug, not a
    /// recoverable condition.
    Inconsistency(String),
    /// Storage backend failure.
    Storage(String),
    /// Serialization errors.
    Serialization(String),
}

impl fmt::Display for RamifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RamifyError::NodeNotFound(id) => write!(f, "Node not found: {}", id),
            RamifyError::QuestionNotFound(id) => write!(f, "Question not found: {}", id),
            RamifyError::InvalidStatus(value) => write!(f, "Invalid status: {}", value),
            RamifyError::MalformedEdge(msg) => write!(f, "Malformed edge: {}", msg),
            RamifyError::Inconsistency(msg) => write!(f, "Internal inconsistency: {}", msg),
            RamifyError::Storage(msg) => write!(f, "Storage error: {}", msg),
            RamifyError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl Error for RamifyError {}

impl From<serde_json::Error> for RamifyError {
    fn from(e: serde_json::Error) -> Self {
        RamifyError::Serialization(e.to_string())
    }
}

// Convenience constructors
impl RamifyError {
    pub fn node_not_found(id: impl Into<String>) -> Self {
        RamifyError::NodeNotFound(id.into())
    }

    pub fn question_not_found(id: impl Into<String>) -> Self {
        RamifyError::QuestionNotFound(id.into())
    }

    pub fn invalid_status(value: impl Into<String>) -> Self {
        RamifyError::InvalidStatus(value.into())
    }

    pub fn inconsistency(msg: impl Into<String>) -> Self {
        RamifyError::Inconsistency(msg.into())
    }
}
