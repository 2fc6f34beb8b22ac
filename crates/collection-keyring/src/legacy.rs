//! The legacy collection keyring: one copy of every collection key in each
//! authorized principal's personal keyring.
//!
//! ## Distribution
//!
//! [`add`](CollectionKeyring::add) reconciles the holders of a collection key
//! with its Recipient Set:
//!
//! 1. The key is written to the scheduler cache, unconditionally.
//! 2. The Recipient Set is fetched from the permission service.
//! 3. Every known principal is listed from the user directory.
//! 4. Each principal is brought in line, one at a time: recipients missing
//!    the key receive it, non-recipients holding it lose it. The first
//!    failure halts the loop. Nothing is rolled back; re-running converges.
//!
//! Principals already in the right state cause no writes, so a repeated
//! `add` is free of durable side effects.
//!
//! ## Sessions
//!
//! Durable writes go to the user directory. When the affected principal is
//! logged in, their cached keyring is updated too, so the change is visible
//! without logging in again.

use std::collections::BTreeSet;
use std::sync::Arc;

use keyring_core::{
    CollectionDescription, CollectionId, Email, PermissionService, PersonalKeyring, Principal,
    Secret, Session, SessionId, SessionService,
};
use keyring_store::UserDirectory;
use tracing::{debug, info, warn};

use crate::cache::KeyringCaches;
use crate::error::{KeyringError, Result};
use crate::keyring::CollectionKeyring;

/// The external services the legacy keyring consults.
#[derive(Clone)]
pub struct Collaborators {
    /// Principals and their persisted keyrings.
    pub directory: Arc<dyn UserDirectory>,
    /// Who may access which collection.
    pub permissions: Arc<dyn PermissionService>,
    /// Who is logged in.
    pub sessions: Arc<dyn SessionService>,
}

/// Diff-and-reconcile distribution across personal keyrings.
pub struct LegacyKeyring {
    directory: Arc<dyn UserDirectory>,
    permissions: Arc<dyn PermissionService>,
    sessions: Arc<dyn SessionService>,
    caches: KeyringCaches,
}

impl LegacyKeyring {
    /// Create a legacy keyring over the given collaborators and caches.
    pub fn new(collaborators: Collaborators, caches: KeyringCaches) -> Self {
        Self {
            directory: collaborators.directory,
            permissions: collaborators.permissions,
            sessions: collaborators.sessions,
            caches,
        }
    }

    /// The caches this keyring writes to.
    pub fn caches(&self) -> &KeyringCaches {
        &self.caches
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session handling
    // ─────────────────────────────────────────────────────────────────────────

    /// Unlock `principal`'s keyring with `password`.
    ///
    /// If the principal's session already caches a keyring, it is replaced by
    /// the unlocked one.
    pub fn unlock(&self, principal: &mut Principal, password: &str) -> Result<()> {
        principal.unlock(password)?;

        if let Some(session) = self.session_of(&principal.email)? {
            if self.caches.sessions.contains(&session.id) {
                self.caches
                    .sessions
                    .insert(&session.id, principal.keyring.clone());
            }
        }

        info!(email = %principal.email, "keyring unlocked");
        Ok(())
    }

    /// Lock the cached keyring of `principal`'s session.
    ///
    /// Returns whether a cached keyring was locked.
    pub fn lock(&self, principal: &Principal) -> Result<bool> {
        let Some(session) = self.session_of(&principal.email)? else {
            return Ok(false);
        };
        Ok(self
            .caches
            .sessions
            .update(&session.id, PersonalKeyring::lock)
            .is_some())
    }

    /// Cache `principal`'s keyring for their active session.
    ///
    /// Application keys are refreshed from the keyring whether or not the
    /// principal has a session. Without a session the session cache is left
    /// untouched.
    pub fn cache_keyring(&self, principal: &Principal) -> Result<()> {
        let copied = self.caches.application.refresh_from(&principal.keyring);
        if copied > 0 {
            debug!(email = %principal.email, copied, "application keys refreshed");
        }

        let Some(session) = self.session_of(&principal.email)? else {
            debug!(email = %principal.email, "no active session, keyring not cached");
            return Ok(());
        };

        self.caches
            .sessions
            .insert(&session.id, principal.keyring.clone());
        debug!(email = %principal.email, session = %session.id, "keyring cached");
        Ok(())
    }

    /// Drop the cached keyring of `session`. Returns whether one existed.
    pub fn end_session(&self, session: &SessionId) -> bool {
        self.caches.sessions.remove(session)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Point-to-point transfer
    // ─────────────────────────────────────────────────────────────────────────

    /// Copy the keys of `collections` from `source`'s cached keyring to `target`.
    ///
    /// `source` must have an active session with an unlocked cached keyring
    /// holding every requested key. `target` is persisted once.
    pub fn assign_to(
        &self,
        source: &Principal,
        target: &mut Principal,
        collections: &[CollectionDescription],
    ) -> Result<()> {
        let ids: Vec<&CollectionId> = collections.iter().map(|c| &c.id).collect();
        self.transfer(source, target, &ids)
    }

    /// Copy the keys of every identifier in `ids` from `source` to `target`.
    ///
    /// Same requirements as [`assign_to`](Self::assign_to).
    pub fn populate(
        &self,
        source: &Principal,
        target: &mut Principal,
        ids: &BTreeSet<CollectionId>,
    ) -> Result<()> {
        let ids: Vec<&CollectionId> = ids.iter().collect();
        self.transfer(source, target, &ids)
    }

    /// Remove the keys of `collections` from `principal`. Persisted once.
    pub fn revoke_from(
        &self,
        principal: &mut Principal,
        collections: &[CollectionDescription],
    ) -> Result<()> {
        if collections.is_empty() {
            return Ok(());
        }

        let session = self.session_of(&principal.email)?;
        for collection in collections {
            if let Some(session) = &session {
                self.caches
                    .sessions
                    .update(&session.id, |keyring| keyring.remove(&collection.id));
            }
            principal.keyring.remove(&collection.id);
        }

        self.persist(principal)?;
        info!(
            email = %principal.email,
            collections = collections.len(),
            "keys revoked"
        );
        Ok(())
    }

    fn transfer(
        &self,
        source: &Principal,
        target: &mut Principal,
        ids: &[&CollectionId],
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        // Every key is read before anything is written.
        let secrets = self.read_cached(source, ids)?;

        let session = self.session_of(&target.email)?;
        for (id, secret) in &secrets {
            target.keyring.put(id, secret)?;
            if let Some(session) = &session {
                self.caches
                    .sessions
                    .update(&session.id, |keyring| keyring.put(id, secret))
                    .transpose()?;
            }
        }

        self.persist(target)?;
        info!(
            source = %source.email,
            target = %target.email,
            keys = secrets.len(),
            "keys assigned"
        );
        Ok(())
    }

    /// Read `ids` from `principal`'s unlocked cached keyring.
    fn read_cached(
        &self,
        principal: &Principal,
        ids: &[&CollectionId],
    ) -> Result<Vec<(CollectionId, Secret)>> {
        let email = &principal.email;
        let session = self
            .session_of(email)?
            .ok_or_else(|| KeyringError::NoSession(email.clone()))?;

        self.caches
            .sessions
            .read(&session.id, |keyring| -> Result<Vec<(CollectionId, Secret)>> {
                let view = keyring
                    .decrypted()
                    .ok_or_else(|| KeyringError::KeyringLocked(email.clone()))?;
                ids.iter()
                    .map(|&id| {
                        view.get(id)
                            .map(|secret| (id.clone(), secret.clone()))
                            .ok_or_else(|| KeyringError::KeyNotFound {
                                email: email.clone(),
                                collection: id.clone(),
                            })
                    })
                    .collect()
            })
            .ok_or_else(|| KeyringError::KeyringNotCached(email.clone()))?
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn session_of(&self, email: &Email) -> Result<Option<Session>> {
        self.sessions
            .find(email)
            .map_err(|source| KeyringError::SessionLookup {
                email: email.clone(),
                source,
            })
    }

    /// Run `f` on the cached keyring of `email`, if they are logged in and cached.
    fn with_cached<R>(
        &self,
        email: &Email,
        f: impl FnOnce(&mut PersonalKeyring) -> R,
    ) -> Result<Option<R>> {
        Ok(self
            .session_of(email)?
            .and_then(|session| self.caches.sessions.update(&session.id, f)))
    }

    fn persist(&self, principal: &Principal) -> Result<()> {
        self.directory
            .update_keyring(principal)
            .map_err(|source| KeyringError::UpdateFailed {
                email: principal.email.clone(),
                source,
            })
    }

    fn assign(&self, principal: &Principal, id: &CollectionId, secret: &Secret) -> Result<()> {
        let email = &principal.email;
        self.directory
            .add_key_to_keyring(email, id, secret)
            .map_err(|source| {
                warn!(%email, collection = %id, error = %source, "adding key failed, halting");
                KeyringError::AddFailed {
                    email: email.clone(),
                    collection: id.clone(),
                    source,
                }
            })?;

        self.with_cached(email, |keyring| keyring.put(id, secret))?
            .transpose()?;
        debug!(%email, collection = %id, "key assigned");
        Ok(())
    }

    fn unassign(&self, principal: &Principal, id: &CollectionId) -> Result<()> {
        let email = &principal.email;
        self.directory
            .remove_key_from_keyring(email, id)
            .map_err(|source| {
                warn!(%email, collection = %id, error = %source, "removing key failed, halting");
                KeyringError::RemoveFailed {
                    email: email.clone(),
                    collection: id.clone(),
                    source,
                }
            })?;

        self.with_cached(email, |keyring| keyring.remove(id))?;
        debug!(%email, collection = %id, "key removed");
        Ok(())
    }

    fn list_principals(&self) -> Result<Vec<Principal>> {
        self.directory.list().map_err(|source| {
            warn!(error = %source, "listing principals failed");
            KeyringError::ListPrincipals(source)
        })
    }
}

impl CollectionKeyring for LegacyKeyring {
    fn get(
        &self,
        principal: &Principal,
        collection: &CollectionDescription,
    ) -> Result<Option<Secret>> {
        let Some(session) = self.session_of(&principal.email)? else {
            return Ok(None);
        };
        Ok(self
            .caches
            .sessions
            .read(&session.id, |keyring| keyring.get(&collection.id).cloned())
            .flatten())
    }

    fn add(&self, collection: &CollectionDescription, secret: &Secret) -> Result<()> {
        let id = &collection.id;

        self.caches.scheduler.add(id, secret);

        let recipients = self
            .permissions
            .access_mapping(collection)
            .map_err(|source| {
                warn!(collection = %id, error = %source, "fetching recipients failed");
                KeyringError::GetRecipients {
                    collection: id.clone(),
                    source,
                }
            })?;

        let principals = self.list_principals()?;

        info!(
            collection = %id,
            fingerprint = %secret.fingerprint(),
            recipients = recipients.len(),
            principals = principals.len(),
            "distributing collection key"
        );

        let (mut assigned, mut removed) = (0usize, 0usize);
        for principal in &principals {
            if recipients.contains(&principal.email) {
                if principal.keyring.holds(id, secret) {
                    continue;
                }
                self.assign(principal, id, secret)?;
                assigned += 1;
            } else if principal.keyring.contains(id) {
                self.unassign(principal, id)?;
                removed += 1;
            }
        }

        info!(collection = %id, assigned, removed, "collection key distributed");
        Ok(())
    }

    fn remove(&self, collection: &CollectionDescription) -> Result<()> {
        let id = &collection.id;
        let principals = self.list_principals()?;

        info!(collection = %id, principals = principals.len(), "revoking collection key");

        let mut removed = 0usize;
        for principal in &principals {
            let session = self.session_of(&principal.email)?;

            // An unlocked cached keyring tells whether the key is held;
            // otherwise the removal is attempted blind.
            let cached_holds = session.as_ref().and_then(|session| {
                self.caches
                    .sessions
                    .read(&session.id, |keyring| {
                        keyring.decrypted().map(|view| view.get(id).is_some())
                    })
                    .flatten()
            });
            if cached_holds == Some(false) {
                continue;
            }

            self.unassign(principal, id)?;
            removed += 1;
        }

        self.caches.scheduler.remove(id);
        info!(collection = %id, removed, "collection key revoked");
        Ok(())
    }

    fn list(&self, principal: &Principal) -> Result<BTreeSet<CollectionId>> {
        let Some(session) = self.session_of(&principal.email)? else {
            return Ok(BTreeSet::new());
        };
        Ok(self
            .caches
            .sessions
            .read(&session.id, |keyring| {
                if keyring.is_unlocked() {
                    keyring.ids()
                } else {
                    BTreeSet::new()
                }
            })
            .unwrap_or_default())
    }

    fn populate_from_user(&self, principal: &Principal) -> Result<()> {
        self.cache_keyring(principal)
    }
}
