use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relata_common::error::RelataError;

pub struct ApiError(pub RelataError);

impl From<RelataError> for ApiError {
    fn from(err: RelataError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            RelataError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            RelataError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            RelataError::Connector(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
