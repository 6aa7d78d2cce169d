use askpdf_rag::{ChatError, SessionSummary};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

pub const SESSION_NOT_FOUND_REPLY: &str = "Session not found.";

#[derive(Debug, Deserialize, Serialize)]
pub struct ReplyResponse {
    pub reply: String,
}

impl ReplyResponse {
    /// Chat endpoints answer an unknown session with a 200 and this body.
    pub fn session_not_found() -> Self {
        Self {
            reply: SESSION_NOT_FOUND_REPLY.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UploadResponse {
    pub session_id: String,
    pub filename: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
}

/// Error response rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn upload_failed(cause: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: format!("Upload failed: {}", cause),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn session_not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: "Session not found".to_string(),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let status = match &err {
            ChatError::SessionNotFound => StatusCode::NOT_FOUND,
            ChatError::MissingQuestion => StatusCode::BAD_REQUEST,
            ChatError::Llm(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}
