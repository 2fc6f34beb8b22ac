//! Key material for personal keyrings and the key store.
//!
//! - [`KeyringPrivateKey`] / [`KeyringPublicKey`]: a principal's X25519 pair.
//!   Sealing to the public half derives a one-off wrap key per collection.
//! - [`EncryptionKey`]: a ChaCha20-Poly1305 key. Wrap keys, password keys and
//!   the key store master key are all of this type.
//! - [`KdfParams`]: Argon2id costs, turning a password and [`Salt`] into an
//!   [`EncryptionKey`].

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CoreError, Result};
use crate::types::CollectionId;

const WRAP_KEY_CONTEXT: &str = "collection-keyring v1 wrap key";

/// Length of password salts in bytes.
pub const SALT_LEN: usize = 16;

/// Length of AEAD nonces in bytes.
pub const NONCE_LEN: usize = 12;

/// The public half of a keyring keypair. Stored in the clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyringPublicKey([u8; 32]);

impl KeyringPublicKey {
    fn point(&self) -> PublicKey {
        PublicKey::from(self.0)
    }

    /// A fresh wrap key for sealing the key of `collection` to this keyring.
    ///
    /// Also returns the ephemeral public key the owner needs to derive the
    /// same wrap key with [`KeyringPrivateKey::unwrap_key`].
    pub fn wrap_key(&self, collection: &CollectionId) -> (KeyringPublicKey, EncryptionKey) {
        let ephemeral = EphemeralSecret::random_from_rng(rand::thread_rng());
        let ephemeral_public = KeyringPublicKey(*PublicKey::from(&ephemeral).as_bytes());
        let shared = ephemeral.diffie_hellman(&self.point());
        (ephemeral_public, wrap_key(shared.as_bytes(), collection))
    }
}

/// The private half of a keyring keypair. Only ever stored password-protected.
#[derive(Clone)]
pub struct KeyringPrivateKey(StaticSecret);

impl KeyringPrivateKey {
    /// Generate a new keypair.
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(rand::thread_rng()))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// The raw scalar, wiped when dropped.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.to_bytes())
    }

    pub fn public_key(&self) -> KeyringPublicKey {
        KeyringPublicKey(*PublicKey::from(&self.0).as_bytes())
    }

    /// The wrap key a sender derived for `collection` with
    /// [`KeyringPublicKey::wrap_key`].
    pub fn unwrap_key(&self, ephemeral: &KeyringPublicKey, collection: &CollectionId) -> EncryptionKey {
        let shared = self.0.diffie_hellman(&ephemeral.point());
        wrap_key(shared.as_bytes(), collection)
    }
}

fn wrap_key(shared: &[u8; 32], collection: &CollectionId) -> EncryptionKey {
    let mut hasher = blake3::Hasher::new_derive_key(WRAP_KEY_CONTEXT);
    hasher.update(shared);
    hasher.update(collection.as_str().as_bytes());
    EncryptionKey(*hasher.finalize().as_bytes())
}

/// A 96-bit ChaCha20-Poly1305 nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AeadNonce([u8; NONCE_LEN]);

impl AeadNonce {
    fn random() -> Self {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self(nonce)
    }
}

/// A 256-bit ChaCha20-Poly1305 key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// A random key.
    pub fn generate() -> Self {
        let mut key = Self([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut key.0);
        key
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<(AeadNonce, Vec<u8>)> {
        let nonce = AeadNonce::random();
        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;
        Ok((nonce, ciphertext))
    }

    /// Decrypt and authenticate `ciphertext`.
    pub fn open(&self, nonce: &AeadNonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.cipher()
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|e| CoreError::DecryptionError(e.to_string()))
    }
}

/// Argon2id cost parameters.
///
/// Persisted next to the salt so a keyring is always unlocked with the costs
/// it was created with, even after the defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// The smallest costs Argon2 accepts. Only suitable for tests.
    pub const fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    /// Derive the key protecting a keyring from `password`.
    pub fn derive(&self, password: &str, salt: &Salt) -> Result<EncryptionKey> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, Some(32))
            .map_err(|e| CoreError::KeyDerivationError(e.to_string()))?;

        let mut key = EncryptionKey([0u8; 32]);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(password.as_bytes(), &salt.0, &mut key.0)
            .map_err(|e| CoreError::KeyDerivationError(e.to_string()))?;
        Ok(key)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// A random password salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    pub fn generate() -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self(salt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(id: &str) -> CollectionId {
        CollectionId::new(id).unwrap()
    }

    #[test]
    fn test_owner_derives_the_senders_wrap_key() {
        let owner = KeyringPrivateKey::generate();

        let (ephemeral, sender_key) = owner.public_key().wrap_key(&collection("138"));
        let owner_key = owner.unwrap_key(&ephemeral, &collection("138"));

        assert_eq!(sender_key.0, owner_key.0);
    }

    #[test]
    fn test_wrap_key_bound_to_collection() {
        let owner = KeyringPrivateKey::generate();

        let (ephemeral, sender_key) = owner.public_key().wrap_key(&collection("138"));

        assert_ne!(sender_key.0, owner.unwrap_key(&ephemeral, &collection("666")).0);
    }

    #[test]
    fn test_wrap_keys_are_fresh_per_seal() {
        let public = KeyringPrivateKey::generate().public_key();

        let (e1, k1) = public.wrap_key(&collection("138"));
        let (e2, k2) = public.wrap_key(&collection("138"));

        assert_ne!(e1, e2);
        assert_ne!(k1.0, k2.0);
    }

    #[test]
    fn test_private_key_export() {
        let key = KeyringPrivateKey::generate();
        let restored = KeyringPrivateKey::from_bytes(*key.to_bytes());
        assert_eq!(key.public_key(), restored.public_key());
    }

    #[test]
    fn test_open_rejects_other_key_and_tampering() {
        let key = EncryptionKey::generate();
        let (nonce, mut ciphertext) = key.seal(b"collection key").unwrap();

        assert_eq!(key.open(&nonce, &ciphertext).unwrap(), b"collection key");
        assert!(EncryptionKey::generate().open(&nonce, &ciphertext).is_err());

        ciphertext[0] ^= 1;
        assert!(matches!(
            key.open(&nonce, &ciphertext),
            Err(CoreError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_password_key_depends_on_password_and_salt() {
        let kdf = KdfParams::minimal();
        let salt = Salt::generate();

        let k1 = kdf.derive("open sesame", &salt).unwrap();

        assert_eq!(k1.0, kdf.derive("open sesame", &salt).unwrap().0);
        assert_ne!(k1.0, kdf.derive("close sesame", &salt).unwrap().0);
        assert_ne!(k1.0, kdf.derive("open sesame", &Salt::generate()).unwrap().0);
    }

    #[test]
    fn test_invalid_kdf_params_rejected() {
        let kdf = KdfParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(matches!(
            kdf.derive("pw", &Salt::generate()),
            Err(CoreError::KeyDerivationError(_))
        ));
    }
}
