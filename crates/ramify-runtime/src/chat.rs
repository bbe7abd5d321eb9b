//! Per-node tutor chat.

use chrono::{DateTime, Utc};
use ramify_core::types::{ChatMessage, ChatRole, NodeInfo};
use ramify_llm::{ContextNode, LlmBackend, Message, PromptTemplate, Role, TutorChatPrompt};
use std::sync::Arc;
use tracing::warn;

const CHAT_FALLBACK: &str =
    "I'm sorry, I encountered an error while processing your message. Please try again.";

/// Generates tutor replies situated on one node.
pub struct TutorChat {
    backend: Arc<dyn LlmBackend>,
}

impl TutorChat {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    /// The canned greeting that opens every node chat.
    pub fn welcome(&self, node: &NodeInfo, now: DateTime<Utc>) -> ChatMessage {
        ChatMessage::new(
            ChatRole::Assistant,
            format!(
                "Hello! I'm your guide for learning about '{}'. What would you like to know or discuss about this topic?",
                node.label
            ),
            now,
        )
    }

    /// Produce the next tutor turn for a node's conversation. Model errors
    /// and empty replies degrade to a fixed apology message.
    pub async fn respond(
        &self,
        node: &NodeInfo,
        history: &[ChatMessage],
        parents: &[ContextNode],
        children: &[ContextNode],
    ) -> String {
        let system = TutorChatPrompt::new(&node.label, &node.content)
            .with_parents(parents.to_vec())
            .with_children(children.to_vec())
            .generate();

        let messages: Vec<Message> = history
            .iter()
            .map(|m| Message {
                role: match m.role {
                    ChatRole::User => Role::User,
                    ChatRole::Assistant => Role::Assistant,
                },
                content: m.content.clone(),
            })
            .collect();

        match self.backend.converse(&messages, Some(&system)).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(node = %node.id, "empty chat reply, using fallback message");
                CHAT_FALLBACK.to_string()
            }
            Err(e) => {
                warn!(node = %node.id, error = %e, "chat reply failed, using fallback message");
                CHAT_FALLBACK.to_string()
            }
        }
    }
}
