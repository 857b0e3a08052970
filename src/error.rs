use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Errors raised by the registry, the strategies and the acquisition loop.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaError {
    /// Invalid configuration, surfaced at startup.
    Config(String),
    /// A load balancing strategy failed while narrowing candidates.
    Strategy(String),
    /// A media node refused or failed to create a router.
    NodeUnavailable { node_id: String, reason: String },
    /// A media node did not answer within the per-attempt timeout.
    Timeout { node_id: String },
    NoMediaNodes,
    Closed,
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Config(msg) => write!(f, "configuration error: {msg}"),
            MediaError::Strategy(msg) => write!(f, "strategy error: {msg}"),
            MediaError::NodeUnavailable { node_id, reason } => {
                write!(f, "media node {node_id} unavailable: {reason}")
            }
            MediaError::Timeout { node_id } => write!(f, "media node {node_id} timed out"),
            MediaError::NoMediaNodes => write!(f, "no media nodes available"),
            MediaError::Closed => write!(f, "media service is closed"),
        }
    }
}

impl std::error::Error for MediaError {}

#[derive(Debug)]
pub enum AppError {
    Internal(String),
    BadRequest(String),
    NotFound(String),
    ServiceUnavailable(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal_error",
            AppError::BadRequest(_) => "invalid_request",
            AppError::NotFound(_) => "not_found",
            AppError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Internal(e) => {
                tracing::error!("internal error: {e}");
                "internal server error".to_string()
            }
            AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::ServiceUnavailable(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.message()
            }
        });

        (status, Json(body)).into_response()
    }
}

impl From<MediaError> for AppError {
    fn from(e: MediaError) -> Self {
        let message = e.to_string();
        match e {
            MediaError::Config(msg) => AppError::BadRequest(msg),
            MediaError::NoMediaNodes | MediaError::Closed => AppError::ServiceUnavailable(message),
            _ => AppError::Internal(message),
        }
    }
}
