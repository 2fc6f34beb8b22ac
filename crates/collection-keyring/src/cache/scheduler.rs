//! The scheduler key cache.
//!
//! Background processing (scheduled publishing) runs with no logged-in
//! principal and reads collection keys from here. Entries are never locked
//! and belong to no principal.

use std::collections::BTreeSet;

use keyring_core::{CollectionId, Secret};
use tracing::debug;

use super::keys::KeyCache;

/// Session-independent map of collection identifier to secret.
#[derive(Debug, Default)]
pub struct SchedulerKeyCache {
    keys: KeyCache,
}

impl SchedulerKeyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the key of `collection`, replacing any previous one.
    pub fn add(&self, collection: &CollectionId, secret: &Secret) {
        if let Some(previous) = self.keys.insert(collection, secret) {
            if previous != *secret {
                debug!(
                    %collection,
                    fingerprint = %secret.fingerprint(),
                    "scheduler key replaced"
                );
            }
        }
    }

    /// The key of `collection`.
    pub fn get(&self, collection: &CollectionId) -> Option<Secret> {
        self.keys.get(collection)
    }

    /// Forget the key of `collection`.
    pub fn remove(&self, collection: &CollectionId) -> Option<Secret> {
        self.keys.remove(collection)
    }

    /// Identifiers of all cached keys.
    pub fn list(&self) -> BTreeSet<CollectionId> {
        self.keys.ids()
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
