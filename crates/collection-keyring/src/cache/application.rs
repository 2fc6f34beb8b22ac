//! The application keys cache.
//!
//! Some keyring entries are not collection keys but keys of applications
//! that run beside the content system. They are configured by name and
//! copied out of every keyring cached at login.

use std::collections::BTreeSet;

use keyring_core::{CollectionId, PersonalKeyring, Secret};

use super::keys::KeyCache;

/// Process-wide cache of configured application keys.
#[derive(Debug, Default)]
pub struct ApplicationKeyCache {
    names: BTreeSet<CollectionId>,
    keys: KeyCache,
}

impl ApplicationKeyCache {
    /// Create a cache for the given application key names.
    pub fn new(names: impl IntoIterator<Item = CollectionId>) -> Self {
        Self {
            names: names.into_iter().collect(),
            keys: KeyCache::new(),
        }
    }

    /// Whether `name` is a configured application key.
    pub fn is_application_key(&self, name: &CollectionId) -> bool {
        self.names.contains(name)
    }

    /// Copy every configured application key held by `keyring`.
    ///
    /// A locked keyring contributes nothing. Returns the number of keys copied.
    pub fn refresh_from(&self, keyring: &PersonalKeyring) -> usize {
        let Some(view) = keyring.decrypted() else {
            return 0;
        };

        let mut copied = 0;
        for (id, secret) in view.iter() {
            if self.is_application_key(id) {
                self.keys.insert(id, secret);
                copied += 1;
            }
        }
        copied
    }

    /// The cached key of application `name`.
    pub fn get(&self, name: &CollectionId) -> Option<Secret> {
        self.keys.get(name)
    }

    /// Names of the applications whose keys are cached.
    pub fn list(&self) -> BTreeSet<CollectionId> {
        self.keys.ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyring_core::KdfParams;

    fn id(value: &str) -> CollectionId {
        CollectionId::new(value).unwrap()
    }

    #[test]
    fn test_copies_only_configured_names() {
        let cache = ApplicationKeyCache::new([id("reader-app")]);
        let mut keyring = PersonalKeyring::create("pw", KdfParams::minimal()).unwrap();
        let app_key = Secret::generate();
        keyring.put(&id("reader-app"), &app_key).unwrap();
        keyring.put(&id("138"), &Secret::generate()).unwrap();

        assert_eq!(cache.refresh_from(&keyring), 1);
        assert_eq!(cache.get(&id("reader-app")), Some(app_key));
        assert_eq!(cache.get(&id("138")), None);
    }

    #[test]
    fn test_locked_keyring_contributes_nothing() {
        let cache = ApplicationKeyCache::new([id("reader-app")]);
        let mut keyring = PersonalKeyring::create("pw", KdfParams::minimal()).unwrap();
        keyring.put(&id("reader-app"), &Secret::generate()).unwrap();
        keyring.lock();

        assert_eq!(cache.refresh_from(&keyring), 0);
        assert!(cache.list().is_empty());
    }
}
