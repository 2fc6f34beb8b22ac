//! Test fixtures and helpers.
//!
//! In-memory collaborators with failure injection, and the Sesame cast of
//! principals used across integration tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use keyring_core::{
    CollectionDescription, CollectionId, Email, KdfParams, PermissionService, Principal, Secret,
    Session, SessionId, SessionService,
};
use keyring_store::{KeyStore, StoreError, UserDirectory, WriteResult};

fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Session service backed by a map of logged-in principals.
#[derive(Default)]
pub struct MemorySessions {
    sessions: Mutex<HashMap<Email, Session>>,
    next_id: AtomicUsize,
    failing: AtomicBool,
}

impl MemorySessions {
    /// Create a service with nobody logged in.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `email`, replacing any previous one.
    pub fn login(&self, email: &Email) -> Session {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = SessionId::new(format!("session-{}", n)).expect("generated session ids are valid");
        let session = Session::new(id, email.clone());
        guard(&self.sessions).insert(email.clone(), session.clone());
        session
    }

    /// End the session of `email`.
    pub fn logout(&self, email: &Email) -> Option<Session> {
        guard(&self.sessions).remove(email)
    }

    /// Make every lookup fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl SessionService for MemorySessions {
    fn find(&self, email: &Email) -> anyhow::Result<Option<Session>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("session service unavailable"));
        }
        Ok(guard(&self.sessions).get(email).cloned())
    }
}

/// Permission service with a fixed access mapping per collection.
///
/// Collections without a mapping have an empty Recipient Set.
#[derive(Default)]
pub struct StaticPermissions {
    mappings: Mutex<HashMap<CollectionId, BTreeSet<Email>>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl StaticPermissions {
    /// Create a service where nobody can access anything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Recipient Set of `collection`.
    pub fn set<'a>(&self, collection: &CollectionId, recipients: impl IntoIterator<Item = &'a Email>) {
        guard(&self.mappings).insert(collection.clone(), recipients.into_iter().cloned().collect());
    }

    /// Make every lookup fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of access mapping requests served or refused.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PermissionService for StaticPermissions {
    fn access_mapping(&self, collection: &CollectionDescription) -> anyhow::Result<BTreeSet<Email>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("permission service unavailable"));
        }
        Ok(guard(&self.mappings)
            .get(&collection.id)
            .cloned()
            .unwrap_or_default())
    }
}

/// A [`UserDirectory`] wrapper that fails on demand.
pub struct FailingDirectory<D> {
    inner: D,
    fail_list: AtomicBool,
    fail_add: Mutex<HashSet<Email>>,
    fail_remove: Mutex<HashSet<Email>>,
    fail_update: Mutex<HashSet<Email>>,
}

impl<D: UserDirectory> FailingDirectory<D> {
    /// Wrap `inner`; no failures are armed.
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            fail_list: AtomicBool::new(false),
            fail_add: Mutex::new(HashSet::new()),
            fail_remove: Mutex::new(HashSet::new()),
            fail_update: Mutex::new(HashSet::new()),
        }
    }

    /// The wrapped directory.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Make `list` fail.
    pub fn fail_list(&self, failing: bool) {
        self.fail_list.store(failing, Ordering::SeqCst);
    }

    /// Make `add_key_to_keyring` fail for `email`.
    pub fn fail_add_for(&self, email: &Email) {
        guard(&self.fail_add).insert(email.clone());
    }

    /// Make `remove_key_from_keyring` fail for `email`.
    pub fn fail_remove_for(&self, email: &Email) {
        guard(&self.fail_remove).insert(email.clone());
    }

    /// Make `update_keyring` fail for `email`.
    pub fn fail_update_for(&self, email: &Email) {
        guard(&self.fail_update).insert(email.clone());
    }

    /// Disarm every failure.
    pub fn heal(&self) {
        self.fail_list.store(false, Ordering::SeqCst);
        guard(&self.fail_add).clear();
        guard(&self.fail_remove).clear();
        guard(&self.fail_update).clear();
    }

    fn check(set: &Mutex<HashSet<Email>>, email: &Email, op: &str) -> keyring_store::Result<()> {
        if guard(set).contains(email) {
            return Err(StoreError::Unavailable(format!("{} for {}", op, email)));
        }
        Ok(())
    }
}

impl<D: UserDirectory> UserDirectory for FailingDirectory<D> {
    fn list(&self) -> keyring_store::Result<Vec<Principal>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("list principals".into()));
        }
        self.inner.list()
    }

    fn get(&self, email: &Email) -> keyring_store::Result<Option<Principal>> {
        self.inner.get(email)
    }

    fn register(&self, principal: &Principal) -> keyring_store::Result<()> {
        self.inner.register(principal)
    }

    fn add_key_to_keyring(
        &self,
        email: &Email,
        collection: &CollectionId,
        secret: &Secret,
    ) -> keyring_store::Result<()> {
        Self::check(&self.fail_add, email, "add key")?;
        self.inner.add_key_to_keyring(email, collection, secret)
    }

    fn remove_key_from_keyring(
        &self,
        email: &Email,
        collection: &CollectionId,
    ) -> keyring_store::Result<()> {
        Self::check(&self.fail_remove, email, "remove key")?;
        self.inner.remove_key_from_keyring(email, collection)
    }

    fn update_keyring(&self, principal: &Principal) -> keyring_store::Result<()> {
        Self::check(&self.fail_update, &principal.email, "update keyring")?;
        self.inner.update_keyring(principal)
    }
}

/// A [`KeyStore`] wrapper that fails on demand.
pub struct FailingKeyStore<K> {
    inner: K,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl<K: KeyStore> FailingKeyStore<K> {
    /// Wrap `inner`; no failures are armed.
    pub fn new(inner: K) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &K {
        &self.inner
    }

    /// Make `exists`, `read` and `ids` fail.
    pub fn fail_reads(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    /// Make `write` and `delete` fail.
    pub fn fail_writes(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, op: &str) -> keyring_store::Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(op.into()));
        }
        Ok(())
    }
}

impl<K: KeyStore> KeyStore for FailingKeyStore<K> {
    fn exists(&self, collection: &CollectionId) -> keyring_store::Result<bool> {
        Self::check(&self.fail_reads, "exists")?;
        self.inner.exists(collection)
    }

    fn read(&self, collection: &CollectionId) -> keyring_store::Result<Option<Secret>> {
        Self::check(&self.fail_reads, "read")?;
        self.inner.read(collection)
    }

    fn write(&self, collection: &CollectionId, secret: &Secret) -> keyring_store::Result<WriteResult> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.write(collection, secret)
    }

    fn delete(&self, collection: &CollectionId) -> keyring_store::Result<bool> {
        Self::check(&self.fail_writes, "delete")?;
        self.inner.delete(collection)
    }

    fn ids(&self) -> keyring_store::Result<BTreeSet<CollectionId>> {
        Self::check(&self.fail_reads, "ids")?;
        self.inner.ids()
    }
}

/// Password shared by every member of the cast.
pub const SESAME_PASSWORD: &str = "open sesame";

/// The Sesame cast: three principals with fresh, unlocked keyrings.
pub struct Sesame {
    pub bert: Principal,
    pub ernie: Principal,
    pub the_count: Principal,
}

impl Sesame {
    /// Create the cast. Keyrings use the cheapest KDF costs.
    pub fn new() -> Self {
        Self {
            bert: member("bert@sesame.street"),
            ernie: member("ernie@sesame.street"),
            the_count: member("thecount@sesame.street"),
        }
    }

    /// Register every member in `directory`.
    pub fn register_all(&self, directory: &impl UserDirectory) {
        for principal in self.all() {
            directory.register(principal).unwrap();
        }
    }

    /// All three members.
    pub fn all(&self) -> [&Principal; 3] {
        [&self.bert, &self.ernie, &self.the_count]
    }
}

impl Default for Sesame {
    fn default() -> Self {
        Self::new()
    }
}

fn member(email: &str) -> Principal {
    Principal::create(Email::new(email).unwrap(), SESAME_PASSWORD, KdfParams::minimal()).unwrap()
}

/// Shorthand for a validated collection identifier.
pub fn collection_id(id: &str) -> CollectionId {
    CollectionId::new(id).unwrap()
}

/// Shorthand for a collection descriptor.
pub fn collection(id: &str) -> CollectionDescription {
    CollectionDescription::from_id(id).unwrap()
}
