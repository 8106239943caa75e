//! Error types for the storage layer.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying SQLite failure.
    #[error("Database connection error: {0}")]
    Connection(#[from] rusqlite::Error),

    /// Every pooled connection stayed checked out for the whole wait.
    #[error("Timed out after {waited:?} waiting for a database connection")]
    PoolTimeout { waited: Duration },

    /// A user with this subject is already registered.
    #[error("User with subject `{0}` already exists")]
    DuplicateSubject(String),

    /// A user with this identifier is already registered.
    #[error("User with identifier `{0}` already exists")]
    DuplicateIdentifier(String),

    /// No user matches the given subject or identifier.
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// A model with this identifier is already registered.
    #[error("Model with identifier `{0}` already exists")]
    DuplicateModel(String),

    /// Caller supplied an unusable argument.
    #[error("Invalid {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { field, reason: reason.into() }
    }

    /// Failures of the store itself rather than of the caller's request.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::PoolTimeout { .. } | Self::Io(_))
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
