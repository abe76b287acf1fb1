//! Error types for devtalk-web

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// devtalk-web error type
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Core(#[from] devtalk_core::Error),
}

/// JSON body of every error reply
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl WebError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebError::Core(devtalk_core::Error::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WebError>;
