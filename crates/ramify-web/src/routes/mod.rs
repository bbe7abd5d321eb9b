//! HTTP routes for the Ramify backend.

mod chat;
mod mindmap;
mod questions;
mod session;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session
        .route("/api/session/init", post(session::init_session))
        .route("/api/session/data", get(session::get_session_data))
        .route("/api/session/progress", get(session::get_progress))
        // Mindmap
        .route("/api/mindmap/create", post(mindmap::create_mindmap))
        .route(
            "/api/mindmap/generate-child-nodes",
            post(mindmap::generate_child_nodes),
        )
        .route(
            "/api/mindmap/nodes/update-status",
            post(mindmap::update_node_status),
        )
        .route("/api/mindmap/nodes/:node_id", get(mindmap::get_node_data))
        // Questions
        .route("/api/questions/generate", post(questions::generate_questions))
        .route("/api/questions/answer", post(questions::answer_question))
        .route(
            "/api/questions/regenerate",
            post(questions::regenerate_questions),
        )
        .route(
            "/api/questions/check-unlockable",
            post(questions::check_unlockable),
        )
        // Chat
        .route(
            "/api/chat/:node_id",
            get(chat::get_node_chat).post(chat::send_chat_message),
        )
        // CORS for development
        .layer(CorsLayer::permissive())
        // State
        .with_state(state)
}
