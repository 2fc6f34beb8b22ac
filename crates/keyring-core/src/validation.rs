//! Identifier and secret validation.
//!
//! Every constructor in [`crate::types`] and [`crate::secret`] funnels through
//! these checks, so invalid inputs are rejected before any keyring, cache, or
//! store is touched.

use crate::error::ValidationError;

/// Validate a collection identifier.
///
/// Identifiers must be non-empty after trimming and free of control
/// characters (they are used as map keys and SQLite primary keys).
pub fn validate_collection_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::EmptyCollectionId);
    }
    reject_control_chars(id)
}

/// Validate a principal email.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    reject_control_chars(email)
}

/// Validate a session identifier.
pub fn validate_session_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::EmptySessionId);
    }
    reject_control_chars(id)
}

/// Validate raw secret material.
pub fn validate_secret(bytes: &[u8]) -> Result<(), ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::EmptySecret);
    }
    Ok(())
}

fn reject_control_chars(value: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacters(value.escape_default().to_string()));
    }
    Ok(())
}
