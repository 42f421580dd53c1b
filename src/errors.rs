use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {message}")]
    NotFound { code: &'static str, message: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl AppError {
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::NotFound { code, message } => {
                tracing::debug!(code, message = %message, "resource not found");
                (StatusCode::NOT_FOUND, code, message)
            }
        };

        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message,
                details: json!({}),
            }),
        )
            .into_response()
    }
}

/// Failures a protocol raises instead of rendering an in-band error envelope.
///
/// The dispatcher reacts to these by trying the next protocol that accepts
/// the request, and finally renders the last one through `Protocol::on_error`.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{0}")]
    InvalidRequest(&'static str),
    #[error("call listener failed: {0}")]
    Listener(#[from] ListenerError),
}

/// Outcome of a failed command invocation.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command not found: {0}")]
    NotFound(String),
    #[error("command execution failed: {0}")]
    Execution(#[source] BoxError),
    #[error("{0}")]
    Unexpected(BoxError),
}

impl CommandError {
    pub fn execution(cause: impl Into<BoxError>) -> Self {
        Self::Execution(cause.into())
    }

    pub fn unexpected(cause: impl Into<BoxError>) -> Self {
        Self::Unexpected(cause.into())
    }
}

#[derive(Debug, Error)]
#[error("{listener}: {message}")]
pub struct ListenerError {
    pub listener: &'static str,
    pub message: String,
}

impl ListenerError {
    pub fn new(listener: &'static str, message: impl Into<String>) -> Self {
        Self {
            listener,
            message: message.into(),
        }
    }
}
