//! Common error types for the interview coach backend

use thiserror::Error;

/// Common result type for coach operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the store, aggregator and service layers
#[derive(Error, Debug)]
pub enum Error {
    /// Requested session id has no record
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Missing or invalid identifiers on an incoming request
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The store could not write a chunk or an aggregated report
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding of stored records
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures on the write path that must reach the caller as a server error
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            Error::Persistence(_) | Error::Database(_) | Error::Serialization(_)
        )
    }
}
