//! Session storage.
//!
//! The store is an injected abstraction so the service layer is testable
//! without a real database and swappable for a persistent backend. The
//! bundled implementation keeps whole aggregates in memory; `load` clones
//! and `save` replaces, so a reader always observes a complete aggregate.

use async_trait::async_trait;
use chrono::Utc;
use ramify_core::aggregate::SessionAggregate;
use ramify_core::status::NodeProgress;
use ramify_core::types::{ChatHistory, EdgeInfo, NodeInfo};
use ramify_core::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// CRUD contract for session aggregates, plus narrower accessors for the
/// fields that change most often.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session's aggregate, creating an empty one if absent.
    async fn load(&self, session_id: &str) -> SessionAggregate;

    /// Replace a session's aggregate.
    async fn save(&self, session_id: &str, aggregate: SessionAggregate);

    /// Upsert one node's progress record.
    async fn update_progress(&self, session_id: &str, progress: NodeProgress);

    /// Upsert one node's info record.
    async fn update_node_info(&self, session_id: &str, info: NodeInfo);

    /// Append one edge, keeping the relationship index in sync.
    async fn add_edge(&self, session_id: &str, edge: EdgeInfo) -> Result<()>;

    /// Fetch one node's chat history, creating an empty one if absent.
    async fn chat_history(&self, session_id: &str, node_id: &str) -> ChatHistory;

    /// Replace one node's chat history.
    async fn save_chat_history(&self, session_id: &str, history: ChatHistory);
}

/// In-memory session store backed by a map of aggregates.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, SessionAggregate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, session_id: &str) -> SessionAggregate {
        {
            let sessions = self.sessions.read().await;
            if let Some(aggregate) = sessions.get(session_id) {
                return aggregate.clone();
            }
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                info!(session = session_id, "creating new session");
                SessionAggregate::new()
            })
            .clone()
    }

    async fn save(&self, session_id: &str, aggregate: SessionAggregate) {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), aggregate);
    }

    async fn update_progress(&self, session_id: &str, progress: NodeProgress) {
        let mut sessions = self.sessions.write().await;
        let aggregate = sessions.entry(session_id.to_string()).or_default();
        aggregate
            .progress
            .insert(progress.node_id.clone(), progress);
    }

    async fn update_node_info(&self, session_id: &str, info: NodeInfo) {
        let mut sessions = self.sessions.write().await;
        let aggregate = sessions.entry(session_id.to_string()).or_default();
        aggregate.nodes.insert(info.id.clone(), info);
    }

    async fn add_edge(&self, session_id: &str, edge: EdgeInfo) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let aggregate = sessions.entry(session_id.to_string()).or_default();
        aggregate.add_edge(edge)
    }

    async fn chat_history(&self, session_id: &str, node_id: &str) -> ChatHistory {
        let mut sessions = self.sessions.write().await;
        let aggregate = sessions.entry(session_id.to_string()).or_default();
        aggregate
            .chats
            .entry(node_id.to_string())
            .or_insert_with(|| ChatHistory::new(node_id, Utc::now()))
            .clone()
    }

    async fn save_chat_history(&self, session_id: &str, history: ChatHistory) {
        let mut sessions = self.sessions.write().await;
        let aggregate = sessions.entry(session_id.to_string()).or_default();
        aggregate.chats.insert(history.node_id.clone(), history);
    }
}
