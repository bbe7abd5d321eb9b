//! Error-to-status mapping for the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ramify_core::RamifyError;
use serde_json::json;

/// Wrapper turning a [`RamifyError`] into an HTTP response. Not-found
/// conditions map to 404, invalid input to 400, everything else to 500.
#[derive(Debug)]
pub struct ApiError(pub RamifyError);

impl From<RamifyError> for ApiError {
    fn from(err: RamifyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RamifyError::NodeNotFound(_) | RamifyError::QuestionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            RamifyError::InvalidStatus(_) | RamifyError::MalformedEdge(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}
