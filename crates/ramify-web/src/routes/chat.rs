//! Per-node tutor chat endpoints.

use crate::error::ApiError;
use crate::routes::session::SessionQuery;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use ramify_core::types::ChatHistory;
use serde::Deserialize;

/// Request body for sending a chat message.
#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub session_id: String,
    pub message: String,
}

/// Get the chat history for a node, seeding the welcome message on first
/// read.
pub async fn get_node_chat(
    Path(node_id): Path<String>,
    Query(query): Query<SessionQuery>,
    State(state): State<AppState>,
) -> Result<Json<ChatHistory>, ApiError> {
    let history = state.service.node_chat(&query.session_id, &node_id).await?;
    Ok(Json(history))
}

/// Send a message in a node's chat and get the tutor's reply.
pub async fn send_chat_message(
    Path(node_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ChatMessageRequest>,
) -> Result<Json<ChatHistory>, ApiError> {
    let history = state
        .service
        .send_chat_message(&req.session_id, &node_id, &req.message)
        .await?;
    Ok(Json(history))
}
