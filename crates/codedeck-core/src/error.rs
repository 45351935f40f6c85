//! Error types for codedeck-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// A required field or parameter was missing or malformed.
    /// Raised before any side effect takes place.
    #[error("validation error: {0}")]
    Validation(String),

    /// No session exists for the given connection identity.
    #[error("not found: {0}")]
    NotFound(String),

    /// Local filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote object storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Shell spawn or pty failure.
    #[error("process error: {0}")]
    Process(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
