//! In-memory implementations of the storage traits.
//!
//! These are primarily for testing. They have the same semantics as SQLite
//! but keep everything in memory with no persistence.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use keyring_core::{CollectionId, Email, Principal, SealedKeyring, Secret};

use crate::error::{Result, StoreError};
use crate::traits::{KeyStore, UserDirectory, WriteResult};

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory key store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<CollectionId, Secret>>,
    writes: AtomicUsize,
}

impl MemoryKeyStore {
    /// Create a new empty in-memory key store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of secrets actually written or deleted.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored secrets.
    pub fn len(&self) -> usize {
        read_lock(&self.keys).len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        read_lock(&self.keys).is_empty()
    }
}

impl KeyStore for MemoryKeyStore {
    fn exists(&self, collection: &CollectionId) -> Result<bool> {
        Ok(read_lock(&self.keys).contains_key(collection))
    }

    fn read(&self, collection: &CollectionId) -> Result<Option<Secret>> {
        Ok(read_lock(&self.keys).get(collection).cloned())
    }

    fn write(&self, collection: &CollectionId, secret: &Secret) -> Result<WriteResult> {
        let mut keys = write_lock(&self.keys);

        if let Some(existing) = keys.get(collection) {
            return Ok(if existing == secret {
                WriteResult::AlreadyExists
            } else {
                WriteResult::Conflict {
                    existing: existing.fingerprint(),
                }
            });
        }

        keys.insert(collection.clone(), secret.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(WriteResult::Written)
    }

    fn delete(&self, collection: &CollectionId) -> Result<bool> {
        let removed = write_lock(&self.keys).remove(collection).is_some();
        if removed {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }

    fn ids(&self) -> Result<BTreeSet<CollectionId>> {
        Ok(read_lock(&self.keys).keys().cloned().collect())
    }
}

/// In-memory user directory.
///
/// Counts every durable keyring mutation so tests can assert idempotence.
#[derive(Default)]
pub struct MemoryUserDirectory {
    keyrings: RwLock<BTreeMap<Email, SealedKeyring>>,
    writes: AtomicUsize,
}

impl MemoryUserDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keyring mutations performed since creation.
    ///
    /// Registration is not counted.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of registered principals.
    pub fn len(&self) -> usize {
        read_lock(&self.keyrings).len()
    }

    /// Whether no principal is registered.
    pub fn is_empty(&self) -> bool {
        read_lock(&self.keyrings).is_empty()
    }

    fn mutate<F>(&self, email: &Email, f: F) -> Result<()>
    where
        F: FnOnce(&mut SealedKeyring) -> Result<()>,
    {
        let mut keyrings = write_lock(&self.keyrings);
        let keyring = keyrings
            .get_mut(email)
            .ok_or_else(|| StoreError::PrincipalNotFound(email.to_string()))?;
        f(keyring)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn list(&self) -> Result<Vec<Principal>> {
        Ok(read_lock(&self.keyrings)
            .iter()
            .map(|(email, sealed)| Principal::from_record(email.clone(), sealed.clone()))
            .collect())
    }

    fn get(&self, email: &Email) -> Result<Option<Principal>> {
        Ok(read_lock(&self.keyrings)
            .get(email)
            .map(|sealed| Principal::from_record(email.clone(), sealed.clone())))
    }

    fn register(&self, principal: &Principal) -> Result<()> {
        let mut keyrings = write_lock(&self.keyrings);
        if keyrings.contains_key(&principal.email) {
            return Err(StoreError::PrincipalExists(principal.email.to_string()));
        }
        keyrings.insert(principal.email.clone(), principal.keyring.sealed().clone());
        Ok(())
    }

    fn add_key_to_keyring(
        &self,
        email: &Email,
        collection: &CollectionId,
        secret: &Secret,
    ) -> Result<()> {
        self.mutate(email, |keyring| Ok(keyring.insert(collection, secret)?))
    }

    fn remove_key_from_keyring(&self, email: &Email, collection: &CollectionId) -> Result<()> {
        self.mutate(email, |keyring| {
            keyring.remove(collection);
            Ok(())
        })
    }

    fn update_keyring(&self, principal: &Principal) -> Result<()> {
        self.mutate(&principal.email, |keyring| {
            *keyring = principal.keyring.sealed().clone();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyring_core::KdfParams;

    fn collection(id: &str) -> CollectionId {
        CollectionId::new(id).unwrap()
    }

    fn principal(email: &str) -> Principal {
        Principal::create(Email::new(email).unwrap(), "pw", KdfParams::minimal()).unwrap()
    }

    #[test]
    fn test_key_store_ids() {
        let store = MemoryKeyStore::new();
        store.write(&collection("666"), &Secret::generate()).unwrap();
        store.write(&collection("138"), &Secret::generate()).unwrap();
        store.delete(&collection("666")).unwrap();

        assert_eq!(store.ids().unwrap(), BTreeSet::from([collection("138")]));
    }

    #[test]
    fn test_key_store_write_once() {
        let store = MemoryKeyStore::new();
        let k1 = Secret::generate();
        let k2 = Secret::generate();

        assert_eq!(store.write(&collection("138"), &k1).unwrap(), WriteResult::Written);
        assert_eq!(
            store.write(&collection("138"), &k1).unwrap(),
            WriteResult::AlreadyExists
        );
        assert_eq!(
            store.write(&collection("138"), &k2).unwrap(),
            WriteResult::Conflict {
                existing: k1.fingerprint()
            }
        );

        assert_eq!(store.read(&collection("138")).unwrap(), Some(k1));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_key_store_delete() {
        let store = MemoryKeyStore::new();
        store.write(&collection("666"), &Secret::generate()).unwrap();

        assert!(store.delete(&collection("666")).unwrap());
        assert!(!store.delete(&collection("666")).unwrap());
        assert!(!store.exists(&collection("666")).unwrap());
    }

    #[test]
    fn test_directory_register_and_list() {
        let directory = MemoryUserDirectory::new();
        let bert = principal("bert@sesame.street");

        directory.register(&bert).unwrap();
        assert!(matches!(
            directory.register(&bert),
            Err(StoreError::PrincipalExists(_))
        ));

        let listed = directory.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].keyring.is_unlocked());
        assert_eq!(directory.write_count(), 0);
    }

    #[test]
    fn test_directory_add_and_remove_key() {
        let directory = MemoryUserDirectory::new();
        let bert = principal("bert@sesame.street");
        directory.register(&bert).unwrap();
        let secret = Secret::generate();

        directory
            .add_key_to_keyring(&bert.email, &collection("138"), &secret)
            .unwrap();
        let mut stored = directory.get(&bert.email).unwrap().unwrap();
        assert!(stored.keyring.holds(&collection("138"), &secret));
        stored.unlock("pw").unwrap();
        assert_eq!(stored.keyring.get(&collection("138")), Some(&secret));

        directory
            .remove_key_from_keyring(&bert.email, &collection("138"))
            .unwrap();
        let stored = directory.get(&bert.email).unwrap().unwrap();
        assert!(!stored.keyring.contains(&collection("138")));
        assert_eq!(directory.write_count(), 2);
    }

    #[test]
    fn test_directory_unknown_principal() {
        let directory = MemoryUserDirectory::new();
        let email = Email::new("grover@sesame.street").unwrap();

        let result = directory.add_key_to_keyring(&email, &collection("1"), &Secret::generate());

        assert!(matches!(result, Err(StoreError::PrincipalNotFound(_))));
        assert_eq!(directory.write_count(), 0);
    }
}
