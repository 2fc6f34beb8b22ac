//! Personal keyrings: the per-principal map of collection secrets.
//!
//! ## Storage model
//!
//! The persisted form is a [`SealedKeyring`]:
//!
//! - the principal's X25519 public key,
//! - the matching private key, protected by the principal's password,
//! - one [`SealedEntry`] per collection: the secret sealed to the public key
//!   plus the secret's [`Fingerprint`].
//!
//! Entries can be added with the public key alone, so distribution never needs
//! a principal's password. Reading entries requires unlocking.
//!
//! ## Lock state
//!
//! A [`PersonalKeyring`] is `Locked` after load and `Unlocked` after a
//! successful [`PersonalKeyring::unlock`]. The decrypted view lives only in
//! memory; serializing a `PersonalKeyring` writes the sealed form alone.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::{KdfParams, KeyringPublicKey, KeyringPrivateKey};
use crate::envelope::PasswordProtected;
use crate::error::{CoreError, Result};
use crate::seal::SealedSecret;
use crate::secret::{Fingerprint, Secret};
use crate::types::CollectionId;

/// Current persisted keyring format version.
pub const KEYRING_VERSION: u8 = 1;

/// One collection secret in the persisted keyring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEntry {
    /// Fingerprint of the sealed secret.
    pub fingerprint: Fingerprint,
    /// The secret sealed to the keyring's public key.
    pub sealed: SealedSecret,
}

/// The persisted, encrypted form of a personal keyring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKeyring {
    version: u8,
    public_key: KeyringPublicKey,
    private_key: PasswordProtected,
    entries: BTreeMap<CollectionId, SealedEntry>,
}

impl SealedKeyring {
    /// Create an empty keyring protected by `password`.
    ///
    /// Returns the private key as well, so the caller can start unlocked
    /// without paying for a second key derivation.
    pub fn create(password: &str, kdf: KdfParams) -> Result<(Self, KeyringPrivateKey)> {
        let private = KeyringPrivateKey::generate();
        let protected = PasswordProtected::seal(&private.to_bytes()[..], password, kdf)?;

        let keyring = Self {
            version: KEYRING_VERSION,
            public_key: private.public_key(),
            private_key: protected,
            entries: BTreeMap::new(),
        };
        Ok((keyring, private))
    }

    /// The public key entries are sealed to.
    pub fn public_key(&self) -> &KeyringPublicKey {
        &self.public_key
    }

    /// Whether an entry exists for `collection`.
    pub fn contains(&self, collection: &CollectionId) -> bool {
        self.entries.contains_key(collection)
    }

    /// Whether the entry for `collection` holds exactly `secret`.
    pub fn holds(&self, collection: &CollectionId, secret: &Secret) -> bool {
        self.entries
            .get(collection)
            .map(|entry| entry.fingerprint == secret.fingerprint())
            .unwrap_or(false)
    }

    /// Seal `secret` into the keyring, replacing any previous entry.
    pub fn insert(&mut self, collection: &CollectionId, secret: &Secret) -> Result<()> {
        let sealed = SealedSecret::seal(collection, secret, &self.public_key)?;
        self.entries.insert(
            collection.clone(),
            SealedEntry {
                fingerprint: secret.fingerprint(),
                sealed,
            },
        );
        Ok(())
    }

    /// Remove the entry for `collection`. Returns whether one existed.
    pub fn remove(&mut self, collection: &CollectionId) -> bool {
        self.entries.remove(collection).is_some()
    }

    /// Identifiers of all entries.
    pub fn ids(&self) -> BTreeSet<CollectionId> {
        self.entries.keys().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the keyring has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recover the private key with `password`.
    pub fn open_private_key(&self, password: &str) -> Result<KeyringPrivateKey> {
        let bytes = Zeroizing::new(self.private_key.open(password)?);
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::DecryptionError(format!(
                "invalid private key length: expected 32, got {}",
                bytes.len()
            )))?;

        let private = KeyringPrivateKey::from_bytes(bytes);
        if private.public_key() != self.public_key {
            return Err(CoreError::DecryptionError(
                "private key does not match keyring public key".into(),
            ));
        }
        Ok(private)
    }

    /// Open every entry with the private key.
    pub fn open_entries(
        &self,
        private: &KeyringPrivateKey,
    ) -> Result<HashMap<CollectionId, Secret>> {
        self.entries
            .iter()
            .map(|(id, entry)| -> Result<(CollectionId, Secret)> {
                Ok((id.clone(), entry.sealed.open(id, private)?))
            })
            .collect()
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let keyring: Self =
            ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        if keyring.version != KEYRING_VERSION {
            return Err(CoreError::UnsupportedVersion(keyring.version));
        }
        Ok(keyring)
    }
}

/// The in-memory decrypted view of an unlocked keyring.
#[derive(Clone)]
pub struct DecryptedKeyring {
    private_key: KeyringPrivateKey,
    keys: HashMap<CollectionId, Secret>,
}

impl DecryptedKeyring {
    /// Look up a decrypted secret.
    pub fn get(&self, collection: &CollectionId) -> Option<&Secret> {
        self.keys.get(collection)
    }

    /// Iterate over all decrypted entries.
    pub fn iter(&self) -> impl Iterator<Item = (&CollectionId, &Secret)> {
        self.keys.iter()
    }
}

impl fmt::Debug for DecryptedKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedKeyring")
            .field("collections", &self.keys.keys().collect::<BTreeSet<_>>())
            .finish_non_exhaustive()
    }
}

/// Lock state of a personal keyring.
#[derive(Debug, Clone)]
pub enum LockState {
    /// Entries are sealed; lookups return nothing.
    Locked,
    /// Entries are decrypted in memory.
    Unlocked(DecryptedKeyring),
}

/// A principal's keyring together with its lock state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SealedKeyring", into = "SealedKeyring")]
pub struct PersonalKeyring {
    sealed: SealedKeyring,
    state: LockState,
}

impl PersonalKeyring {
    /// Create a new, empty, unlocked keyring protected by `password`.
    pub fn create(password: &str, kdf: KdfParams) -> Result<Self> {
        let (sealed, private_key) = SealedKeyring::create(password, kdf)?;
        Ok(Self {
            sealed,
            state: LockState::Unlocked(DecryptedKeyring {
                private_key,
                keys: HashMap::new(),
            }),
        })
    }

    /// Wrap a persisted keyring. The result is locked.
    pub fn from_sealed(sealed: SealedKeyring) -> Self {
        Self {
            sealed,
            state: LockState::Locked,
        }
    }

    /// Decrypt the keyring with `password`.
    ///
    /// On failure the keyring stays in its previous state.
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        let private_key = self.sealed.open_private_key(password)?;
        let keys = self.sealed.open_entries(&private_key)?;
        self.state = LockState::Unlocked(DecryptedKeyring { private_key, keys });
        Ok(())
    }

    /// Drop the decrypted view.
    pub fn lock(&mut self) {
        self.state = LockState::Locked;
    }

    /// Current lock state.
    pub fn state(&self) -> &LockState {
        &self.state
    }

    /// Whether the keyring is unlocked.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, LockState::Unlocked(_))
    }

    /// Look up a secret. Always `None` while locked.
    pub fn get(&self, collection: &CollectionId) -> Option<&Secret> {
        match &self.state {
            LockState::Unlocked(view) => view.get(collection),
            LockState::Locked => None,
        }
    }

    /// Decrypted entries, or `None` while locked.
    pub fn decrypted(&self) -> Option<&DecryptedKeyring> {
        match &self.state {
            LockState::Unlocked(view) => Some(view),
            LockState::Locked => None,
        }
    }

    /// Add or replace a secret.
    ///
    /// Works while locked: the sealed form only needs the public key.
    pub fn put(&mut self, collection: &CollectionId, secret: &Secret) -> Result<()> {
        self.sealed.insert(collection, secret)?;
        if let LockState::Unlocked(view) = &mut self.state {
            view.keys.insert(collection.clone(), secret.clone());
        }
        Ok(())
    }

    /// Remove a secret. Returns whether an entry existed.
    pub fn remove(&mut self, collection: &CollectionId) -> bool {
        let sealed = self.sealed.remove(collection);
        let decrypted = match &mut self.state {
            LockState::Unlocked(view) => view.keys.remove(collection).is_some(),
            LockState::Locked => false,
        };
        sealed || decrypted
    }

    /// Whether an entry exists for `collection`, locked or not.
    pub fn contains(&self, collection: &CollectionId) -> bool {
        self.sealed.contains(collection)
    }

    /// Whether the entry for `collection` holds exactly `secret`.
    pub fn holds(&self, collection: &CollectionId, secret: &Secret) -> bool {
        self.sealed.holds(collection, secret)
    }

    /// Identifiers of all entries.
    pub fn ids(&self) -> BTreeSet<CollectionId> {
        self.sealed.ids()
    }

    /// The persisted form.
    pub fn sealed(&self) -> &SealedKeyring {
        &self.sealed
    }

    /// The private key of an unlocked keyring.
    pub fn private_key(&self) -> Option<&KeyringPrivateKey> {
        self.decrypted().map(|view| &view.private_key)
    }
}

impl From<SealedKeyring> for PersonalKeyring {
    fn from(sealed: SealedKeyring) -> Self {
        Self::from_sealed(sealed)
    }
}

impl From<PersonalKeyring> for SealedKeyring {
    fn from(keyring: PersonalKeyring) -> Self {
        keyring.sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(id: &str) -> CollectionId {
        CollectionId::new(id).unwrap()
    }

    fn keyring() -> PersonalKeyring {
        PersonalKeyring::create("sesame", KdfParams::minimal()).unwrap()
    }

    #[test]
    fn test_new_keyring_is_unlocked_and_empty() {
        let keyring = keyring();
        assert!(keyring.is_unlocked());
        assert!(keyring.ids().is_empty());
    }

    #[test]
    fn test_locked_get_returns_none() {
        let mut keyring = keyring();
        let secret = Secret::generate();
        keyring.put(&collection("138"), &secret).unwrap();
        assert_eq!(keyring.get(&collection("138")), Some(&secret));

        keyring.lock();

        assert!(!keyring.is_unlocked());
        assert_eq!(keyring.get(&collection("138")), None);
        assert!(keyring.contains(&collection("138")));
    }

    #[test]
    fn test_unlock_restores_entries() {
        let mut keyring = keyring();
        let secret = Secret::generate();
        keyring.put(&collection("138"), &secret).unwrap();
        keyring.lock();

        keyring.unlock("sesame").unwrap();

        assert_eq!(keyring.get(&collection("138")), Some(&secret));
    }

    #[test]
    fn test_unlock_wrong_password_stays_locked() {
        let mut keyring = keyring();
        keyring.lock();

        let err = keyring.unlock("wrong").unwrap_err();

        assert!(matches!(err, CoreError::InvalidCredential));
        assert!(!keyring.is_unlocked());
    }

    #[test]
    fn test_put_while_locked_is_visible_after_unlock() {
        let mut keyring = keyring();
        keyring.lock();
        let secret = Secret::generate();

        keyring.put(&collection("666"), &secret).unwrap();
        assert_eq!(keyring.get(&collection("666")), None);

        keyring.unlock("sesame").unwrap();
        assert_eq!(keyring.get(&collection("666")), Some(&secret));
    }

    #[test]
    fn test_holds_compares_fingerprints() {
        let mut keyring = keyring();
        let secret = Secret::generate();
        keyring.put(&collection("138"), &secret).unwrap();
        keyring.lock();

        assert!(keyring.holds(&collection("138"), &secret));
        assert!(!keyring.holds(&collection("138"), &Secret::generate()));
        assert!(!keyring.holds(&collection("666"), &secret));
    }

    #[test]
    fn test_remove() {
        let mut keyring = keyring();
        keyring.put(&collection("138"), &Secret::generate()).unwrap();

        assert!(keyring.remove(&collection("138")));
        assert!(!keyring.remove(&collection("138")));
        assert!(!keyring.contains(&collection("138")));
        assert_eq!(keyring.get(&collection("138")), None);
    }

    #[test]
    fn test_persisted_form_is_locked_on_load() {
        let mut keyring = keyring();
        let secret = Secret::generate();
        keyring.put(&collection("138"), &secret).unwrap();

        let bytes = keyring.sealed().to_bytes().unwrap();
        let mut loaded = PersonalKeyring::from_sealed(SealedKeyring::from_bytes(&bytes).unwrap());

        assert!(!loaded.is_unlocked());
        loaded.unlock("sesame").unwrap();
        assert_eq!(loaded.get(&collection("138")), Some(&secret));
    }

    #[test]
    fn test_serialization_never_contains_plaintext() {
        let mut keyring = keyring();
        let secret = Secret::new(b"plaintext-collection-key-material".to_vec()).unwrap();
        keyring.put(&collection("138"), &secret).unwrap();

        let mut buf = Vec::new();
        ciborium::into_writer(&keyring, &mut buf).unwrap();

        assert!(!buf
            .windows(secret.len())
            .any(|window| window == secret.expose()));
    }
}
