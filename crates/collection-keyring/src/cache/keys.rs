//! A concurrent map of collection identifier to secret.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use keyring_core::{CollectionId, Secret};

/// Recover the guard of a poisoned lock.
///
/// Every critical section in the caches is a single map operation, so a
/// panicking holder cannot leave a map half-updated.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Thread-safe map of collection identifier to secret.
#[derive(Debug, Default)]
pub struct KeyCache {
    keys: RwLock<HashMap<CollectionId, Secret>>,
}

impl KeyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a secret.
    pub fn get(&self, collection: &CollectionId) -> Option<Secret> {
        read_lock(&self.keys).get(collection).cloned()
    }

    /// Insert or replace a secret, returning the previous one.
    pub fn insert(&self, collection: &CollectionId, secret: &Secret) -> Option<Secret> {
        write_lock(&self.keys).insert(collection.clone(), secret.clone())
    }

    /// Remove a secret, returning it.
    pub fn remove(&self, collection: &CollectionId) -> Option<Secret> {
        write_lock(&self.keys).remove(collection)
    }

    /// Whether a secret is cached for `collection`.
    pub fn contains(&self, collection: &CollectionId) -> bool {
        read_lock(&self.keys).contains_key(collection)
    }

    /// Identifiers of all cached secrets.
    pub fn ids(&self) -> BTreeSet<CollectionId> {
        read_lock(&self.keys).keys().cloned().collect()
    }

    /// Number of cached secrets.
    pub fn len(&self) -> usize {
        read_lock(&self.keys).len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        read_lock(&self.keys).is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        write_lock(&self.keys).clear();
    }
}
