//! Shared setup for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use collection_keyring::{Collaborators, KeyringConfig, KeyringService};
use keyring_core::{CollectionDescription, CollectionId, KdfParams, Principal, Secret};
use keyring_store::{MemoryKeyStore, MemoryUserDirectory, UserDirectory};
use keyring_testkit::{
    FailingDirectory, FailingKeyStore, MemorySessions, Sesame, StaticPermissions,
    SESAME_PASSWORD,
};

pub type TestKeyStore = Arc<FailingKeyStore<MemoryKeyStore>>;

/// A service wired to in-memory collaborators, plus handles on each of them.
pub struct World {
    pub directory: Arc<FailingDirectory<MemoryUserDirectory>>,
    pub permissions: Arc<StaticPermissions>,
    pub sessions: Arc<MemorySessions>,
    pub key_store: TestKeyStore,
    pub service: KeyringService<TestKeyStore>,
    pub cast: Sesame,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(KeyringConfig::default())
    }

    pub fn with_config(config: KeyringConfig) -> Self {
        init_tracing();

        let directory = Arc::new(FailingDirectory::new(MemoryUserDirectory::new()));
        let permissions = Arc::new(StaticPermissions::new());
        let sessions = Arc::new(MemorySessions::new());
        let key_store = Arc::new(FailingKeyStore::new(MemoryKeyStore::new()));

        let collaborators = Collaborators {
            directory: directory.clone(),
            permissions: permissions.clone(),
            sessions: sessions.clone(),
        };
        let service = KeyringService::new(
            config.with_kdf(KdfParams::minimal()),
            collaborators,
            Arc::clone(&key_store),
        );

        let cast = Sesame::new();
        cast.register_all(directory.as_ref());

        Self {
            directory,
            permissions,
            sessions,
            key_store,
            service,
            cast,
        }
    }

    /// The principal as currently persisted: locked, latest entries.
    pub fn stored(&self, principal: &Principal) -> Principal {
        self.directory.get(&principal.email).unwrap().unwrap()
    }

    /// Start a session and log in through the service (both keyrings).
    pub fn login(&self, principal: &Principal) -> Principal {
        self.sessions.login(&principal.email);
        let mut fresh = self.stored(principal);
        self.service.login(&mut fresh, SESAME_PASSWORD).unwrap();
        fresh
    }

    /// Start a session and warm the legacy keyring only.
    pub fn login_legacy(&self, principal: &Principal) -> Principal {
        self.sessions.login(&principal.email);
        let mut fresh = self.stored(principal);
        self.service.unlock(&mut fresh, SESAME_PASSWORD).unwrap();
        self.service.cache_keyring(&fresh).unwrap();
        fresh
    }

    /// Seed a key straight into a principal's persisted keyring.
    pub fn seed(&self, principal: &Principal, collection: &CollectionId, secret: &Secret) {
        self.directory
            .inner()
            .add_key_to_keyring(&principal.email, collection, secret)
            .unwrap();
    }

    /// Whether the persisted keyring of `principal` holds exactly `secret`.
    pub fn holds(&self, principal: &Principal, collection: &CollectionId, secret: &Secret) -> bool {
        self.stored(principal).keyring.holds(collection, secret)
    }

    /// Whether the persisted keyring of `principal` has any entry for `collection`.
    pub fn has_entry(&self, principal: &Principal, collection: &CollectionId) -> bool {
        self.stored(principal).keyring.contains(collection)
    }

    /// The key visible to `principal` through their cached legacy keyring.
    pub fn cached(&self, principal: &Principal, collection: &CollectionDescription) -> Option<Secret> {
        use collection_keyring::CollectionKeyring;
        self.service.legacy().get(principal, collection).unwrap()
    }

    pub fn writes(&self) -> usize {
        self.directory.inner().write_count()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
