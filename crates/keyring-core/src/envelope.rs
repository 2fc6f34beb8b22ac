//! Symmetric envelopes.
//!
//! [`EncryptedPayload`] is ciphertext under a key the reader already holds,
//! such as the key store master key. [`PasswordProtected`] carries its own
//! Argon2id salt and costs, so the password alone opens it.

use serde::{Deserialize, Serialize};

use crate::crypto::{AeadNonce, EncryptionKey, KdfParams, Salt};
use crate::error::{CoreError, Result};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Ciphertext plus the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    version: u8,
    nonce: AeadNonce,
    ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Encrypt `plaintext` under `key`.
    pub fn seal(key: &EncryptionKey, plaintext: &[u8]) -> Result<Self> {
        let (nonce, ciphertext) = key.seal(plaintext)?;
        Ok(Self {
            version: ENVELOPE_VERSION,
            nonce,
            ciphertext,
        })
    }

    pub fn open(&self, key: &EncryptionKey) -> Result<Vec<u8>> {
        if self.version != ENVELOPE_VERSION {
            return Err(CoreError::UnsupportedVersion(self.version));
        }
        key.open(&self.nonce, &self.ciphertext)
    }

    /// CBOR encoding, as stored in key store records.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

/// Data encrypted under a password-derived key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordProtected {
    salt: Salt,
    kdf: KdfParams,
    payload: EncryptedPayload,
}

impl PasswordProtected {
    /// Encrypt `plaintext` under `password` with a fresh salt.
    pub fn seal(plaintext: &[u8], password: &str, kdf: KdfParams) -> Result<Self> {
        let salt = Salt::generate();
        let payload = EncryptedPayload::seal(&kdf.derive(password, &salt)?, plaintext)?;
        Ok(Self { salt, kdf, payload })
    }

    /// Decrypt with `password`.
    ///
    /// A failed authentication tag is reported as [`CoreError::InvalidCredential`]:
    /// with a well-formed envelope the only cause is a wrong password.
    pub fn open(&self, password: &str) -> Result<Vec<u8>> {
        let key = self.kdf.derive(password, &self.salt)?;
        self.payload
            .open(&key)
            .map_err(|_| CoreError::InvalidCredential)
    }

    /// The costs this envelope was sealed with.
    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }
}
