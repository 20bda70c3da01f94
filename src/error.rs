use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Local JSON strategies exhausted. Carries the text that failed.
    #[error("Could not extract valid JSON from the response")]
    ExtractionFailed { text: String },

    /// Every repair strategy failed, including the remote repair agent.
    #[error("Could not parse or fix JSON: {reason}")]
    RepairFailed {
        text: String,
        response: String,
        reason: String,
    },

    /// Upstream document missing or unreadable. The message is user facing.
    #[error("{0}")]
    Retrieval(String),

    #[error("Calendar push failed: {0}")]
    Push(String),

    #[error("LLM provider error: {0}")]
    Llm(String),

    #[error("Calendar API error: {0}")]
    Calendar(String),

    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    InternalServerError,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Retrieval(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::ExtractionFailed { text } => {
                error!("json extraction failed on: {}", text);
                (
                    StatusCode::BAD_GATEWAY,
                    "Could not extract valid JSON from the model response".to_string(),
                )
            }
            AppError::RepairFailed { text, response, reason } => {
                error!(
                    "json repair failed: {} (original: {}, repair agent: {})",
                    reason, text, response
                );
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Could not parse or fix JSON: {}", reason),
                )
            }
            err @ (AppError::Llm(_)
            | AppError::Calendar(_)
            | AppError::Push(_)
            | AppError::InvalidOutput(_)) => {
                error!("upstream error: {}", err);
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
