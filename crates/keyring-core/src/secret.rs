//! Opaque collection secrets.
//!
//! A [`Secret`] is the symmetric key of a collection. This crate never looks
//! inside it: secrets are compared, sealed, and handed back, nothing else.

use bytes::Bytes;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::validation::validate_secret;

/// Domain separation context for secret fingerprints.
const FINGERPRINT_CONTEXT: &str = "collection-keyring v1 secret fingerprint";

/// Length of secrets produced by [`Secret::generate`].
pub const GENERATED_SECRET_LEN: usize = 32;

/// An opaque, non-empty collection secret.
///
/// Backed by [`Bytes`] so the many cache copies (scheduler, session, central)
/// share one allocation. `Debug` never prints the material.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "Bytes", into = "Bytes")]
pub struct Secret(Bytes);

impl Secret {
    /// Create a secret from raw bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self, ValidationError> {
        let bytes = bytes.into();
        validate_secret(&bytes)?;
        Ok(Self(bytes))
    }

    /// Generate a random 256-bit secret.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; GENERATED_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(Bytes::from(bytes))
    }

    /// Expose the raw bytes (for the encryption collaborator only).
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Length of the secret in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; secrets are validated non-empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compute the fingerprint of this secret.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint(blake3::derive_key(FINGERPRINT_CONTEXT, &self.0))
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint() == other.fingerprint()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", self.fingerprint())
    }
}

impl TryFrom<Bytes> for Secret {
    type Error = ValidationError;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl From<Secret> for Bytes {
    fn from(secret: Secret) -> Self {
        secret.0
    }
}

/// Keyed Blake3 digest of a secret.
///
/// Stored next to sealed entries so "already holds this secret" can be decided
/// without the owner's password. Equality is constant-time.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        blake3::Hash::from(self.0) == blake3::Hash::from(other.0)
    }
}

impl Eq for Fingerprint {}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            Secret::new(Vec::<u8>::new()),
            Err(ValidationError::EmptySecret)
        ));
    }

    #[test]
    fn test_secret_equality_by_content() {
        let a = Secret::new(b"same-key".to_vec()).unwrap();
        let b = Secret::new(b"same-key".to_vec()).unwrap();
        let c = Secret::new(b"other-key".to_vec()).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_debug_does_not_leak_material() {
        let secret = Secret::new(b"super-secret-material".to_vec()).unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super"));
        assert!(debug.starts_with("Secret("));
    }

    #[test]
    fn test_generated_secrets_differ() {
        let a = Secret::generate();
        let b = Secret::generate();
        assert_eq!(a.len(), GENERATED_SECRET_LEN);
        assert_ne!(a, b);
    }

    proptest::proptest! {
        #[test]
        fn prop_fingerprint_tracks_content(
            a in proptest::collection::vec(proptest::prelude::any::<u8>(), 1..64),
            b in proptest::collection::vec(proptest::prelude::any::<u8>(), 1..64),
        ) {
            let same = a == b;
            let (a, b) = (Secret::new(a).unwrap(), Secret::new(b).unwrap());

            proptest::prop_assert_eq!(a.fingerprint() == b.fingerprint(), same);
        }
    }
}
