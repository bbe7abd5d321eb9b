//! Session-scoped endpoints: init and read-only views.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use ramify_core::status::NodeProgress;
use ramify_core::types::EdgeInfo;
use ramify_runtime::{GraphNodeInput, SessionData};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Request body for initializing a session with graph data.
#[derive(Debug, Deserialize)]
pub struct InitSessionRequest {
    pub session_id: String,
    pub nodes: Vec<GraphNodeInput>,
    pub edges: Vec<EdgeInfo>,
}

/// Query string carrying just a session id.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

/// Initialize or update a session with graph data.
pub async fn init_session(
    State(state): State<AppState>,
    Json(req): Json<InitSessionRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .init_session(&req.session_id, req.nodes, req.edges)
        .await?;
    Ok(Json(json!({
        "message": "Session initialized successfully",
        "session_id": req.session_id,
    })))
}

/// Get the full graph data for a session.
pub async fn get_session_data(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Json<SessionData> {
    Json(state.service.session_data(&query.session_id).await)
}

/// Get the per-node progress for a session.
pub async fn get_progress(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Json<HashMap<String, NodeProgress>> {
    Json(state.service.session_data(&query.session_id).await.progress)
}
