//! The session keyring cache: active session to personal keyring.

use std::collections::HashMap;
use std::sync::RwLock;

use keyring_core::{PersonalKeyring, SessionId};

use super::keys::{read_lock, write_lock};

/// Map of active session to that principal's keyring.
///
/// Entries are created at login and removed at session end. A cached
/// keyring may be locked, in which case reads through it are soft misses.
#[derive(Debug, Default)]
pub struct SessionKeyringCache {
    entries: RwLock<HashMap<SessionId, PersonalKeyring>>,
}

impl SessionKeyringCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache `keyring` for `session`, replacing any previous entry.
    pub fn insert(&self, session: &SessionId, keyring: PersonalKeyring) {
        write_lock(&self.entries).insert(session.clone(), keyring);
    }

    /// Read the entry of `session`.
    pub fn read<R>(&self, session: &SessionId, f: impl FnOnce(&PersonalKeyring) -> R) -> Option<R> {
        read_lock(&self.entries).get(session).map(f)
    }

    /// Modify the entry of `session` in place.
    pub fn update<R>(
        &self,
        session: &SessionId,
        f: impl FnOnce(&mut PersonalKeyring) -> R,
    ) -> Option<R> {
        write_lock(&self.entries).get_mut(session).map(f)
    }

    /// Remove the entry of `session`. Returns whether one existed.
    pub fn remove(&self, session: &SessionId) -> bool {
        write_lock(&self.entries).remove(session).is_some()
    }

    /// Whether `session` has a cached keyring.
    pub fn contains(&self, session: &SessionId) -> bool {
        read_lock(&self.entries).contains_key(session)
    }

    /// Number of cached keyrings.
    pub fn len(&self) -> usize {
        read_lock(&self.entries).len()
    }

    /// Whether no keyring is cached.
    pub fn is_empty(&self) -> bool {
        read_lock(&self.entries).is_empty()
    }
}
