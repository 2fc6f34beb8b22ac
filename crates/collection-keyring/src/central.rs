//! The central collection keyring: one process-wide cache over the durable
//! key store.
//!
//! Once established, the key of a collection never changes. Writing a
//! different key for a collection that already has one is a
//! [`KeyMismatch`](KeyringError::KeyMismatch); neither the cache nor the
//! store is touched.
//!
//! Application keys share personal keyrings with collection keys but are not
//! collection keys: they are never migrated into the central keyring.

use std::collections::BTreeSet;
use std::sync::Arc;

use keyring_core::{CollectionDescription, CollectionId, Principal, Secret};
use keyring_store::{KeyStore, WriteResult};
use tracing::{debug, info, warn};

use crate::cache::{ApplicationKeyCache, KeyCache};
use crate::error::{KeyringError, Result};
use crate::keyring::CollectionKeyring;

/// Single-writer keyring layered over a [`KeyStore`].
pub struct CentralKeyring<K: KeyStore> {
    store: K,
    cache: KeyCache,
    application: Arc<ApplicationKeyCache>,
}

impl<K: KeyStore> CentralKeyring<K> {
    /// Create a central keyring over `store` with an empty cache.
    pub fn new(store: K) -> Self {
        Self {
            store,
            cache: KeyCache::new(),
            application: Arc::default(),
        }
    }

    /// Skip the application keys known to `application` when migrating
    /// personal keyrings.
    pub fn with_application_keys(mut self, application: Arc<ApplicationKeyCache>) -> Self {
        self.application = application;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &K {
        &self.store
    }

    /// The cached key of `collection`, without consulting the store.
    pub fn cached(&self, collection: &CollectionId) -> Option<Secret> {
        self.cache.get(collection)
    }

    /// Establish `secret` as the key of `collection`.
    pub fn add_key(&self, collection: &CollectionId, secret: &Secret) -> Result<()> {
        if let Some(cached) = self.cache.get(collection) {
            if cached == *secret {
                return Ok(());
            }
            return Err(mismatch(collection, "cache"));
        }

        match self.store.read(collection).map_err(store_error(collection))? {
            Some(stored) if stored == *secret => {
                debug!(%collection, "key already stored, warming cache");
            }
            Some(_) => return Err(mismatch(collection, "store")),
            None => match self
                .store
                .write(collection, secret)
                .map_err(store_error(collection))?
            {
                WriteResult::Written => {
                    info!(%collection, fingerprint = %secret.fingerprint(), "collection key established");
                }
                WriteResult::AlreadyExists => {}
                WriteResult::Conflict { .. } => return Err(mismatch(collection, "store")),
            },
        }

        self.cache.insert(collection, secret);
        Ok(())
    }

    /// The key of `collection`: cache first, then the store.
    ///
    /// A store hit warms the cache.
    pub fn get_key(&self, collection: &CollectionId) -> Result<Option<Secret>> {
        if let Some(cached) = self.cache.get(collection) {
            return Ok(Some(cached));
        }

        let stored = self.store.read(collection).map_err(store_error(collection))?;
        if let Some(secret) = &stored {
            self.cache.insert(collection, secret);
        }
        Ok(stored)
    }

    /// Evict the key of a deleted collection and delete its record.
    pub fn remove_key(&self, collection: &CollectionId) -> Result<()> {
        self.cache.remove(collection);
        let existed = self
            .store
            .delete(collection)
            .map_err(store_error(collection))?;
        if existed {
            info!(%collection, "collection key deleted");
        }
        Ok(())
    }
}

fn mismatch(collection: &CollectionId, against: &str) -> KeyringError {
    warn!(%collection, against, "refusing to replace established collection key");
    KeyringError::KeyMismatch(collection.clone())
}

fn store_error(collection: &CollectionId) -> impl FnOnce(keyring_store::StoreError) -> KeyringError + '_ {
    move |source| KeyringError::KeyStore {
        collection: collection.clone(),
        source,
    }
}

impl<K: KeyStore> CollectionKeyring for CentralKeyring<K> {
    fn get(
        &self,
        _principal: &Principal,
        collection: &CollectionDescription,
    ) -> Result<Option<Secret>> {
        self.get_key(&collection.id)
    }

    fn add(&self, collection: &CollectionDescription, secret: &Secret) -> Result<()> {
        self.add_key(&collection.id, secret)
    }

    fn remove(&self, collection: &CollectionDescription) -> Result<()> {
        self.remove_key(&collection.id)
    }

    /// Every established key, read from the store so a cold cache after a
    /// restart still lists everything.
    fn list(&self, _principal: &Principal) -> Result<BTreeSet<CollectionId>> {
        self.store.ids().map_err(|source| {
            warn!(error = %source, "listing stored collection keys failed");
            KeyringError::ListKeys(source)
        })
    }

    /// Migrate every collection key of `principal`'s unlocked keyring into
    /// the central keyring. Application keys stay behind.
    fn populate_from_user(&self, principal: &Principal) -> Result<()> {
        let view = principal
            .keyring
            .decrypted()
            .ok_or_else(|| KeyringError::KeyringLocked(principal.email.clone()))?;

        let mut entries: Vec<_> = view
            .iter()
            .filter(|(id, _)| !self.application.is_application_key(id))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (collection, secret) in &entries {
            self.add_key(collection, secret)?;
        }

        debug!(email = %principal.email, keys = entries.len(), "keyring migrated to central");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyring_core::{Email, KdfParams};
    use keyring_store::MemoryKeyStore;

    fn id(value: &str) -> CollectionId {
        CollectionId::new(value).unwrap()
    }

    #[test]
    fn test_add_writes_store_then_cache() {
        let central = CentralKeyring::new(MemoryKeyStore::new());
        let key = Secret::generate();

        central.add_key(&id("138"), &key).unwrap();

        assert_eq!(central.cached(&id("138")), Some(key.clone()));
        assert_eq!(central.store().read(&id("138")).unwrap(), Some(key));
    }

    #[test]
    fn test_add_same_key_twice_is_noop() {
        let central = CentralKeyring::new(MemoryKeyStore::new());
        let key = Secret::generate();

        central.add_key(&id("138"), &key).unwrap();
        central.add_key(&id("138"), &key).unwrap();

        assert_eq!(central.store().write_count(), 1);
    }

    #[test]
    fn test_add_different_key_after_cached() {
        let central = CentralKeyring::new(MemoryKeyStore::new());
        let k1 = Secret::generate();

        central.add_key(&id("138"), &k1).unwrap();
        let err = central.add_key(&id("138"), &Secret::generate()).unwrap_err();

        assert!(matches!(err, KeyringError::KeyMismatch(ref c) if *c == id("138")));
        assert_eq!(central.cached(&id("138")), Some(k1.clone()));
        assert_eq!(central.store().read(&id("138")).unwrap(), Some(k1));
    }

    #[test]
    fn test_stored_matching_key_warms_cache() {
        let store = MemoryKeyStore::new();
        let key = Secret::generate();
        store.write(&id("138"), &key).unwrap();
        let central = CentralKeyring::new(store);

        central.add_key(&id("138"), &key).unwrap();

        assert_eq!(central.cached(&id("138")), Some(key));
        assert_eq!(central.store().write_count(), 1);
    }

    #[test]
    fn test_get_warms_cache_from_store() {
        let store = MemoryKeyStore::new();
        let key = Secret::generate();
        store.write(&id("138"), &key).unwrap();
        let central = CentralKeyring::new(store);

        assert_eq!(central.cached(&id("138")), None);
        assert_eq!(central.get_key(&id("138")).unwrap(), Some(key.clone()));
        assert_eq!(central.cached(&id("138")), Some(key));
        assert_eq!(central.get_key(&id("666")).unwrap(), None);
    }

    #[test]
    fn test_list_reads_the_store_not_the_cache() {
        let store = Arc::new(MemoryKeyStore::new());
        CentralKeyring::new(Arc::clone(&store))
            .add_key(&id("138"), &Secret::generate())
            .unwrap();
        let principal =
            Principal::create(Email::new("bert@sesame.street").unwrap(), "pw", KdfParams::minimal())
                .unwrap();

        let restarted = CentralKeyring::new(store);

        assert_eq!(restarted.cached(&id("138")), None);
        assert_eq!(restarted.list(&principal).unwrap(), BTreeSet::from([id("138")]));
    }

    #[test]
    fn test_populate_skips_application_keys() {
        let application = Arc::new(ApplicationKeyCache::new([id("reader-app")]));
        let central = CentralKeyring::new(MemoryKeyStore::new()).with_application_keys(application);
        let mut principal =
            Principal::create(Email::new("bert@sesame.street").unwrap(), "pw", KdfParams::minimal())
                .unwrap();
        principal.keyring.put(&id("reader-app"), &Secret::generate()).unwrap();
        principal.keyring.put(&id("138"), &Secret::generate()).unwrap();

        central.populate_from_user(&principal).unwrap();

        assert!(!central.store().exists(&id("reader-app")).unwrap());
        assert!(central.store().exists(&id("138")).unwrap());
    }

    #[test]
    fn test_remove_evicts_and_deletes() {
        let central = CentralKeyring::new(MemoryKeyStore::new());
        central.add_key(&id("666"), &Secret::generate()).unwrap();

        central.remove_key(&id("666")).unwrap();

        assert_eq!(central.cached(&id("666")), None);
        assert!(!central.store().exists(&id("666")).unwrap());
        // A deleted collection may be re-keyed.
        central.add_key(&id("666"), &Secret::generate()).unwrap();
    }
}
