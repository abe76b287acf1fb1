//! Error types for devtalk-core

use thiserror::Error;

/// Main error type for devtalk-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model provider error: {0}")]
    Provider(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for devtalk-core
pub type Result<T> = std::result::Result<T, Error>;
