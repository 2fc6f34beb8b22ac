//! Storage traits: the abstract interfaces for key persistence.
//!
//! Two stores back the keyrings. The [`KeyStore`] holds one secret per
//! collection for the central model. The [`UserDirectory`] holds every
//! principal's sealed personal keyring for the legacy model.

use std::collections::BTreeSet;

use keyring_core::{CollectionId, Email, Fingerprint, Principal, Secret};

use crate::error::Result;

/// Result of writing a secret to the key store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    /// Secret was written.
    Written,
    /// The identical secret was already stored (idempotent, not an error).
    AlreadyExists,
    /// A different secret is stored for this collection. Nothing was written.
    Conflict {
        /// Fingerprint of the stored secret.
        existing: Fingerprint,
    },
}

/// Durable key store: one immutable secret per collection.
///
/// # Design Notes
///
/// - **Write-once**: `write` never replaces a stored secret; a different value
///   yields [`WriteResult::Conflict`].
/// - **Deletion**: `delete` removes the record of a deleted collection. It is
///   the only way a stored secret disappears.
pub trait KeyStore: Send + Sync {
    /// Whether a secret is stored for `collection`.
    fn exists(&self, collection: &CollectionId) -> Result<bool>;

    /// Read the secret stored for `collection`.
    fn read(&self, collection: &CollectionId) -> Result<Option<Secret>>;

    /// Store `secret` for `collection` unless a secret is already stored.
    fn write(&self, collection: &CollectionId, secret: &Secret) -> Result<WriteResult>;

    /// Delete the record for `collection`. Returns whether one existed.
    fn delete(&self, collection: &CollectionId) -> Result<bool>;

    /// Identifiers of every stored secret.
    fn ids(&self) -> Result<BTreeSet<CollectionId>>;
}

/// The directory of principals and their persisted keyrings.
///
/// Principals returned by [`UserDirectory::list`] and [`UserDirectory::get`]
/// carry locked keyrings: the directory never sees a password.
pub trait UserDirectory: Send + Sync {
    /// All known principals.
    fn list(&self) -> Result<Vec<Principal>>;

    /// Look up one principal.
    fn get(&self, email: &Email) -> Result<Option<Principal>>;

    /// Create the record for a new principal.
    fn register(&self, principal: &Principal) -> Result<()>;

    /// Seal `secret` into the persisted keyring of `email`.
    fn add_key_to_keyring(&self, email: &Email, collection: &CollectionId, secret: &Secret)
        -> Result<()>;

    /// Remove `collection` from the persisted keyring of `email`.
    ///
    /// Removing an absent entry succeeds.
    fn remove_key_from_keyring(&self, email: &Email, collection: &CollectionId) -> Result<()>;

    /// Persist the whole keyring of `principal`.
    fn update_keyring(&self, principal: &Principal) -> Result<()>;
}

impl<T: KeyStore + ?Sized> KeyStore for std::sync::Arc<T> {
    fn exists(&self, collection: &CollectionId) -> Result<bool> {
        (**self).exists(collection)
    }

    fn read(&self, collection: &CollectionId) -> Result<Option<Secret>> {
        (**self).read(collection)
    }

    fn write(&self, collection: &CollectionId, secret: &Secret) -> Result<WriteResult> {
        (**self).write(collection, secret)
    }

    fn delete(&self, collection: &CollectionId) -> Result<bool> {
        (**self).delete(collection)
    }

    fn ids(&self) -> Result<BTreeSet<CollectionId>> {
        (**self).ids()
    }
}

/// Extension trait with convenience methods.
pub trait KeyStoreExt: KeyStore {
    /// Fingerprint of the stored secret, if any.
    fn fingerprint(&self, collection: &CollectionId) -> Result<Option<Fingerprint>> {
        Ok(self.read(collection)?.map(|secret| secret.fingerprint()))
    }
}

impl<T: KeyStore + ?Sized> KeyStoreExt for T {}
