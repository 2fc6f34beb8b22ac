//! The keyring service: the composition root of the keyring subsystem.
//!
//! Built once at start-up from configuration and collaborators and passed
//! to the collection lifecycle and API layers. Tests build a fresh service
//! per case.

use std::collections::BTreeSet;
use std::sync::Arc;

use keyring_core::{
    CollectionDescription, CollectionId, Email, Principal, Secret, SessionId,
};
use keyring_store::{KeyStore, UserDirectory};
use tracing::info;

use crate::cache::{ApplicationKeyCache, KeyringCaches, SchedulerKeyCache};
use crate::central::CentralKeyring;
use crate::config::{CentralFlag, KeyringConfig};
use crate::error::{KeyringError, Result};
use crate::keyring::CollectionKeyring;
use crate::legacy::{Collaborators, LegacyKeyring};
use crate::migration::MigrationKeyring;

/// The migration keyring as composed by [`KeyringService`].
pub type ServiceKeyring<K> = MigrationKeyring<Arc<LegacyKeyring>, Arc<CentralKeyring<K>>>;

/// The keyring subsystem: caches, the three keyrings and the central flag.
pub struct KeyringService<K: KeyStore> {
    config: KeyringConfig,
    directory: Arc<dyn UserDirectory>,
    caches: KeyringCaches,
    legacy: Arc<LegacyKeyring>,
    central: Arc<CentralKeyring<K>>,
    keyring: ServiceKeyring<K>,
}

impl<K: KeyStore> KeyringService<K> {
    /// Build the service.
    pub fn new(config: KeyringConfig, collaborators: Collaborators, key_store: K) -> Self {
        let caches = KeyringCaches::new(config.application_keys.iter().cloned());
        let flag = CentralFlag::new(config.central_enabled);
        let directory = Arc::clone(&collaborators.directory);

        let legacy = Arc::new(LegacyKeyring::new(collaborators, caches.clone()));
        let central = Arc::new(
            CentralKeyring::new(key_store).with_application_keys(Arc::clone(&caches.application)),
        );
        let keyring = MigrationKeyring::new(Arc::clone(&legacy), Arc::clone(&central), flag);

        info!(
            central_enabled = config.central_enabled,
            application_keys = config.application_keys.len(),
            "keyring service started"
        );

        Self {
            config,
            directory,
            caches,
            legacy,
            central,
            keyring,
        }
    }

    /// The configuration the service was built with.
    pub fn config(&self) -> &KeyringConfig {
        &self.config
    }

    /// The migration keyring serving reads and writes.
    pub fn keyring(&self) -> &ServiceKeyring<K> {
        &self.keyring
    }

    /// The legacy keyring.
    pub fn legacy(&self) -> &LegacyKeyring {
        &self.legacy
    }

    /// The central keyring.
    pub fn central(&self) -> &CentralKeyring<K> {
        &self.central
    }

    /// The flag selecting the read path.
    pub fn flag(&self) -> &CentralFlag {
        self.keyring.flag()
    }

    /// Switch reads to (or away from) the central keyring.
    pub fn set_central_enabled(&self, enabled: bool) {
        self.keyring.flag().set(enabled);
        info!(enabled, "central keyring flag changed");
    }

    /// The scheduler key cache.
    pub fn scheduler_cache(&self) -> &SchedulerKeyCache {
        &self.caches.scheduler
    }

    /// The application keys cache.
    pub fn application_keys(&self) -> &ApplicationKeyCache {
        &self.caches.application
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accounts and sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Create and register a principal with an empty keyring.
    ///
    /// The returned principal is unlocked.
    pub fn create_principal(&self, email: Email, password: &str) -> Result<Principal> {
        let principal = Principal::create(email, password, self.config.kdf)?;
        self.directory
            .register(&principal)
            .map_err(|source| KeyringError::UpdateFailed {
                email: principal.email.clone(),
                source,
            })?;
        info!(email = %principal.email, "principal created");
        Ok(principal)
    }

    /// Unlock `principal` and warm both keyrings from their keyring.
    pub fn login(&self, principal: &mut Principal, password: &str) -> Result<()> {
        self.legacy.unlock(principal, password)?;
        self.keyring.populate_from_user(principal)
    }

    /// Drop the cached keyring of `session`.
    pub fn end_session(&self, session: &SessionId) -> bool {
        self.legacy.end_session(session)
    }

    /// Unlock `principal`'s keyring. See [`LegacyKeyring::unlock`].
    pub fn unlock(&self, principal: &mut Principal, password: &str) -> Result<()> {
        self.legacy.unlock(principal, password)
    }

    /// Lock the cached keyring of `principal`'s session.
    pub fn lock(&self, principal: &Principal) -> Result<bool> {
        self.legacy.lock(principal)
    }

    /// Cache `principal`'s keyring for their session.
    pub fn cache_keyring(&self, principal: &Principal) -> Result<()> {
        self.legacy.cache_keyring(principal)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collection keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Establish and distribute the key of `collection`.
    pub fn add(&self, collection: &CollectionDescription, secret: &Secret) -> Result<()> {
        self.keyring.add(collection, secret)
    }

    /// Revoke the key of a deleted collection everywhere.
    pub fn remove(&self, collection: &CollectionDescription) -> Result<()> {
        self.keyring.remove(collection)
    }

    /// The key of `collection` as visible to `principal`.
    pub fn get(
        &self,
        principal: &Principal,
        collection: &CollectionDescription,
    ) -> Result<Option<Secret>> {
        self.keyring.get(principal, collection)
    }

    /// Collections whose keys `principal` can read.
    pub fn list(&self, principal: &Principal) -> Result<BTreeSet<CollectionId>> {
        self.keyring.list(principal)
    }

    /// Warm both keyrings from `principal`'s keyring.
    pub fn populate_from_user(&self, principal: &Principal) -> Result<()> {
        self.keyring.populate_from_user(principal)
    }

    /// Copy keys from `source` to `target`. See [`LegacyKeyring::assign_to`].
    pub fn assign_to(
        &self,
        source: &Principal,
        target: &mut Principal,
        collections: &[CollectionDescription],
    ) -> Result<()> {
        self.legacy.assign_to(source, target, collections)
    }

    /// Remove keys from `principal`. See [`LegacyKeyring::revoke_from`].
    pub fn revoke_from(
        &self,
        principal: &mut Principal,
        collections: &[CollectionDescription],
    ) -> Result<()> {
        self.legacy.revoke_from(principal, collections)
    }

    /// Copy keys by identifier. See [`LegacyKeyring::populate`].
    pub fn populate(
        &self,
        source: &Principal,
        target: &mut Principal,
        ids: &BTreeSet<CollectionId>,
    ) -> Result<()> {
        self.legacy.populate(source, target, ids)
    }
}
