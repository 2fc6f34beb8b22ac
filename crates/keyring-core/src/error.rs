//! Error types for the Collection Keyring core.

use thiserror::Error;

/// Core errors that can occur while sealing, opening, or decoding keyrings.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid credential")]
    InvalidCredential,

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("decryption error: {0}")]
    DecryptionError(String),

    #[error("key derivation error: {0}")]
    KeyDerivationError(String),

    #[error("unsupported keyring version: {0}")]
    UnsupportedVersion(u8),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation errors for identifiers and secrets.
///
/// Raised by constructors, so a value that exists has already passed them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("collection identifier must not be empty")]
    EmptyCollectionId,

    #[error("secret must not be empty")]
    EmptySecret,

    #[error("email must not be empty")]
    EmptyEmail,

    #[error("session identifier must not be empty")]
    EmptySessionId,

    #[error("identifier {0:?} contains control characters")]
    ControlCharacters(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
