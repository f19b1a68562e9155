//! Error types for filekeep.

use std::path::PathBuf;

use thiserror::Error;

/// Common error type for filekeep.
#[derive(Error, Debug)]
pub enum FilekeepError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error not attributable to a specific storage step.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Bad or missing metadata, detected before any side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// The record store rejected a new record.
    #[error("failed to persist file record: {0}")]
    ModelPersist(String),

    /// A storage directory could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Resource bytes could not be written to their destination.
    #[error("failed to write file {}: {source}", path.display())]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored file could not be read.
    #[error("failed to read file {}: {source}", path.display())]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored file exists but could not be removed.
    #[error("failed to delete file {}: {source}", path.display())]
    FileDeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata row could not be removed.
    #[error("failed to delete file record {id}: {reason}")]
    RecordDeleteFailed { id: i64, reason: String },

    /// No record exists for the given id.
    #[error("file record {0} not found")]
    RecordNotFound(i64),
}

impl From<sqlx::Error> for FilekeepError {
    fn from(e: sqlx::Error) -> Self {
        FilekeepError::Database(e.to_string())
    }
}

/// Result type alias for filekeep operations.
pub type Result<T> = std::result::Result<T, FilekeepError>;
