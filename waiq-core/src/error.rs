//! Error types for waiq-core

use crate::platform::Permission;
use thiserror::Error;

/// Main error type for the waiq-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A device capability was not granted
    #[error("permission denied: {0}")]
    PermissionDenied(Permission),

    /// A device provider failed to answer
    #[error("provider error: {0}")]
    Provider(String),
}

/// Result type alias for waiq-core
pub type Result<T> = std::result::Result<T, Error>;
