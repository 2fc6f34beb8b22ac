//! Error types for the collection keyrings.

use std::fmt;

use keyring_core::{CollectionId, CoreError, Email, ValidationError};
use keyring_store::StoreError;
use thiserror::Error;

/// The phase of an operation in which an upstream collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Listing principals from the user directory.
    ListPrincipals,
    /// Fetching the Recipient Set from the permission service.
    GetRecipients,
    /// Writing a key into a principal's persisted keyring.
    AddToStore,
    /// Removing a key from a principal's persisted keyring.
    RemoveFromStore,
    /// Persisting a principal's whole keyring.
    UpdateKeyring,
    /// Looking up a principal's session.
    SessionLookup,
    /// Reading or writing the durable key store.
    KeyStore,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::ListPrincipals => "list-principals",
            Phase::GetRecipients => "get-recipients",
            Phase::AddToStore => "add-to-store",
            Phase::RemoveFromStore => "remove-from-store",
            Phase::UpdateKeyring => "update-keyring",
            Phase::SessionLookup => "session-lookup",
            Phase::KeyStore => "key-store",
        })
    }
}

/// Broad classification of a [`KeyringError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid input, rejected before any side effect.
    Validation,
    /// A wrong password or a keyring that fails to open.
    Credential,
    /// A session, cache entry or key that a mutating operation needs is missing.
    Absence,
    /// The keyring exists but is locked.
    State,
    /// A different key is already established for the collection.
    Consistency,
    /// A collaborator failed.
    Upstream,
}

/// Errors that can occur during keyring operations.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unlocking or sealing a personal keyring failed.
    #[error("keyring error: {0}")]
    Core(#[from] CoreError),

    /// The principal has no active session.
    #[error("no active session for {0}")]
    NoSession(Email),

    /// The principal's session has no cached keyring.
    #[error("keyring of {0} is not cached")]
    KeyringNotCached(Email),

    /// The principal's cached keyring is locked.
    #[error("keyring of {0} is locked")]
    KeyringLocked(Email),

    /// The keyring does not hold a key for the collection.
    #[error("keyring of {email} holds no key for collection {collection}")]
    KeyNotFound {
        email: Email,
        collection: CollectionId,
    },

    /// A different key is already established for the collection.
    #[error("key mismatch for collection {0}: a different key is already established")]
    KeyMismatch(CollectionId),

    /// Listing principals failed.
    #[error("failed to list principals")]
    ListPrincipals(#[source] StoreError),

    /// Fetching the Recipient Set failed.
    #[error("failed to get recipients of collection {collection}")]
    GetRecipients {
        collection: CollectionId,
        #[source]
        source: anyhow::Error,
    },

    /// Adding a key to a principal's persisted keyring failed.
    #[error("failed to add key for collection {collection} to keyring of {email}")]
    AddFailed {
        email: Email,
        collection: CollectionId,
        #[source]
        source: StoreError,
    },

    /// Removing a key from a principal's persisted keyring failed.
    #[error("failed to remove key for collection {collection} from keyring of {email}")]
    RemoveFailed {
        email: Email,
        collection: CollectionId,
        #[source]
        source: StoreError,
    },

    /// Persisting a principal's keyring failed.
    #[error("failed to persist keyring of {email}")]
    UpdateFailed {
        email: Email,
        #[source]
        source: StoreError,
    },

    /// Looking up a principal's session failed.
    #[error("failed to look up session of {email}")]
    SessionLookup {
        email: Email,
        #[source]
        source: anyhow::Error,
    },

    /// Listing the durable key store failed.
    #[error("failed to list stored collection keys")]
    ListKeys(#[source] StoreError),

    /// The durable key store failed.
    #[error("key store failed for collection {collection}")]
    KeyStore {
        collection: CollectionId,
        #[source]
        source: StoreError,
    },
}

impl KeyringError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyringError::Validation(_) => ErrorKind::Validation,
            KeyringError::Core(CoreError::Validation(_)) => ErrorKind::Validation,
            KeyringError::Core(_) => ErrorKind::Credential,
            KeyringError::NoSession(_)
            | KeyringError::KeyringNotCached(_)
            | KeyringError::KeyNotFound { .. } => ErrorKind::Absence,
            KeyringError::KeyringLocked(_) => ErrorKind::State,
            KeyringError::KeyMismatch(_) => ErrorKind::Consistency,
            _ => ErrorKind::Upstream,
        }
    }

    /// The phase that failed, for upstream errors.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            KeyringError::ListPrincipals(_) => Some(Phase::ListPrincipals),
            KeyringError::GetRecipients { .. } => Some(Phase::GetRecipients),
            KeyringError::AddFailed { .. } => Some(Phase::AddToStore),
            KeyringError::RemoveFailed { .. } => Some(Phase::RemoveFromStore),
            KeyringError::UpdateFailed { .. } => Some(Phase::UpdateKeyring),
            KeyringError::SessionLookup { .. } => Some(Phase::SessionLookup),
            KeyringError::KeyStore { .. } | KeyringError::ListKeys(_) => Some(Phase::KeyStore),
            _ => None,
        }
    }
}

/// Result type for keyring operations.
pub type Result<T> = std::result::Result<T, KeyringError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_upstream_errors_keep_their_cause() {
        let err = KeyringError::AddFailed {
            email: Email::new("bert@sesame.street").unwrap(),
            collection: CollectionId::new("138").unwrap(),
            source: StoreError::Unavailable("disk full".into()),
        };

        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.phase(), Some(Phase::AddToStore));
        assert!(err.source().unwrap().to_string().contains("disk full"));
    }

    #[test]
    fn test_anyhow_cause_is_reachable() {
        let err = KeyringError::GetRecipients {
            collection: CollectionId::new("138").unwrap(),
            source: anyhow::anyhow!("permissions offline"),
        };

        assert_eq!(err.phase().map(|p| p.to_string()).as_deref(), Some("get-recipients"));
        assert_eq!(err.source().unwrap().to_string(), "permissions offline");
    }

    #[test]
    fn test_kinds() {
        let email = Email::new("ernie@sesame.street").unwrap();

        assert_eq!(
            KeyringError::from(ValidationError::EmptySecret).kind(),
            ErrorKind::Validation
        );
        assert_eq!(KeyringError::NoSession(email.clone()).kind(), ErrorKind::Absence);
        assert_eq!(KeyringError::KeyringLocked(email).kind(), ErrorKind::State);
        assert_eq!(
            KeyringError::KeyMismatch(CollectionId::new("1").unwrap()).kind(),
            ErrorKind::Consistency
        );
        assert_eq!(KeyringError::from(CoreError::InvalidCredential).kind(), ErrorKind::Credential);
        assert_eq!(KeyringError::KeyMismatch(CollectionId::new("1").unwrap()).phase(), None);
    }
}
