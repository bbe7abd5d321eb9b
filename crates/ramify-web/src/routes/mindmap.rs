//! Mindmap endpoints: creation, expansion, status updates, node reads.

use crate::error::ApiError;
use crate::routes::session::SessionQuery;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use ramify_core::aggregate::NodeView;
use ramify_core::status::NodeState;
use ramify_runtime::GraphSnapshot;
use serde::Deserialize;
use serde_json::{json, Value};

/// Request body for creating a new mindmap.
#[derive(Debug, Deserialize)]
pub struct CreateMindmapRequest {
    pub session_id: String,
    pub topic: String,
    #[serde(default)]
    pub max_depth: Option<usize>,
}

/// Request body for expanding one node.
#[derive(Debug, Deserialize)]
pub struct ExpandNodeRequest {
    pub session_id: String,
    pub node_id: String,
    #[serde(default)]
    pub max_children: Option<usize>,
}

/// Request body for a manual status update.
#[derive(Debug, Deserialize)]
pub struct UpdateNodeStatusRequest {
    pub session_id: String,
    pub node_id: String,
    pub status: String,
}

/// Generate a mindmap for a topic and commit it to the session.
pub async fn create_mindmap(
    State(state): State<AppState>,
    Json(req): Json<CreateMindmapRequest>,
) -> Json<GraphSnapshot> {
    Json(
        state
            .service
            .create_mindmap(&req.session_id, &req.topic, req.max_depth)
            .await,
    )
}

/// Generate child nodes for an existing node.
pub async fn generate_child_nodes(
    State(state): State<AppState>,
    Json(req): Json<ExpandNodeRequest>,
) -> Result<Json<GraphSnapshot>, ApiError> {
    let snapshot = state
        .service
        .expand_node(&req.session_id, &req.node_id, req.max_children)
        .await?;
    Ok(Json(snapshot))
}

/// Update the status of a node. Rejects values outside the allowed set
/// before touching the session.
pub async fn update_node_status(
    State(state): State<AppState>,
    Json(req): Json<UpdateNodeStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let status: NodeState = req.status.parse().map_err(ApiError::from)?;
    state
        .service
        .update_node_status(&req.session_id, &req.node_id, status)
        .await?;
    Ok(Json(json!({ "success": true, "status": status.as_str() })))
}

/// Get data for a specific node, including related nodes.
pub async fn get_node_data(
    Path(node_id): Path<String>,
    Query(query): Query<SessionQuery>,
    State(state): State<AppState>,
) -> Result<Json<NodeView>, ApiError> {
    let view = state.service.node_data(&query.session_id, &node_id).await?;
    Ok(Json(view))
}
