//! Question endpoints: generation, answering, regeneration, unlock checks.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::State;
use axum::Json;
use ramify_llm::ContextNode;
use ramify_runtime::{AnswerOutcome, QuestionSet, UnlockReport};
use serde::Deserialize;
use serde_json::{json, Value};

/// Request body for generating questions about a node.
#[derive(Debug, Deserialize)]
pub struct GenerateQuestionsRequest {
    pub session_id: String,
    pub node_id: String,
    pub node_label: String,
    pub node_content: String,
    #[serde(default)]
    pub parent_nodes: Vec<ContextNode>,
    #[serde(default)]
    pub child_nodes: Vec<ContextNode>,
}

/// Request body for submitting an answer.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub session_id: String,
    pub node_id: String,
    pub question_id: String,
    pub answer: String,
}

/// Request body naming one node in one session.
#[derive(Debug, Deserialize)]
pub struct NodeRequest {
    pub session_id: String,
    pub node_id: String,
}

/// Generate questions for a specific node.
pub async fn generate_questions(
    State(state): State<AppState>,
    Json(req): Json<GenerateQuestionsRequest>,
) -> Result<Json<QuestionSet>, ApiError> {
    let set = state
        .service
        .generate_questions(
            &req.session_id,
            &req.node_id,
            &req.node_label,
            &req.node_content,
            req.parent_nodes,
            req.child_nodes,
        )
        .await?;
    Ok(Json(set))
}

/// Submit and evaluate an answer to a question.
pub async fn answer_question(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerOutcome>, ApiError> {
    let outcome = state
        .service
        .answer_question(&req.session_id, &req.node_id, &req.question_id, &req.answer)
        .await?;
    Ok(Json(outcome))
}

/// Archive a node's questions and reset it for a fresh generation round.
pub async fn regenerate_questions(
    State(state): State<AppState>,
    Json(req): Json<NodeRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .regenerate_questions(&req.session_id, &req.node_id)
        .await?;
    Ok(Json(json!({
        "message": "Questions reset successfully. Generate new questions with the generate endpoint.",
    })))
}

/// Check whether a node is unlockable under the configured rule.
pub async fn check_unlockable(
    State(state): State<AppState>,
    Json(req): Json<NodeRequest>,
) -> Json<UnlockReport> {
    Json(
        state
            .service
            .check_unlockable(&req.session_id, &req.node_id)
            .await,
    )
}
