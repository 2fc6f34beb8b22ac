//! Error types for the store module.

use keyring_core::CoreError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Sealing or opening a record failed.
    #[error("keyring error: {0}")]
    Core(#[from] CoreError),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Principal not found.
    #[error("principal not found: {0}")]
    PrincipalNotFound(String),

    /// Principal already registered.
    #[error("principal already registered: {0}")]
    PrincipalExists(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The backend refused the operation (injected failures, unavailable backends).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
