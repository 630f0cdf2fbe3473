//! Error types for the Stockroom core crate.

use thiserror::Error;

/// Top-level error type for all Stockroom operations.
#[derive(Debug, Error)]
pub enum StockroomError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("directory error: {0}")]
    Directory(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("audit error: {0}")]
    Audit(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote error ({status}): {message}")]
    Remote { status: u16, message: String },
}

/// A convenience Result alias that defaults to [`StockroomError`].
pub type Result<T> = std::result::Result<T, StockroomError>;
