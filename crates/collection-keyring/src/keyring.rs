//! The collection keyring capability.

use std::collections::BTreeSet;
use std::sync::Arc;

use keyring_core::{CollectionDescription, CollectionId, Principal, Secret};

use crate::error::Result;

/// Establishes, distributes and serves collection keys.
///
/// Implemented by the legacy per-principal keyring, the central keyring and
/// the migration decorator composing both.
pub trait CollectionKeyring: Send + Sync {
    /// The key of `collection` as visible to `principal`.
    ///
    /// Missing sessions, cache entries, keys or a locked keyring are `Ok(None)`.
    fn get(&self, principal: &Principal, collection: &CollectionDescription)
        -> Result<Option<Secret>>;

    /// Establish `secret` as the key of `collection`.
    fn add(&self, collection: &CollectionDescription, secret: &Secret) -> Result<()>;

    /// Forget the key of a deleted collection.
    fn remove(&self, collection: &CollectionDescription) -> Result<()>;

    /// Identifiers of the collections whose keys `principal` can read.
    fn list(&self, principal: &Principal) -> Result<BTreeSet<CollectionId>>;

    /// Warm the keyring from `principal`'s unlocked personal keyring at login.
    fn populate_from_user(&self, principal: &Principal) -> Result<()>;
}

impl<T: CollectionKeyring + ?Sized> CollectionKeyring for Arc<T> {
    fn get(
        &self,
        principal: &Principal,
        collection: &CollectionDescription,
    ) -> Result<Option<Secret>> {
        (**self).get(principal, collection)
    }

    fn add(&self, collection: &CollectionDescription, secret: &Secret) -> Result<()> {
        (**self).add(collection, secret)
    }

    fn remove(&self, collection: &CollectionDescription) -> Result<()> {
        (**self).remove(collection)
    }

    fn list(&self, principal: &Principal) -> Result<BTreeSet<CollectionId>> {
        (**self).list(principal)
    }

    fn populate_from_user(&self, principal: &Principal) -> Result<()> {
        (**self).populate_from_user(principal)
    }
}
