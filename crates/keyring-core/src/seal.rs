//! Sealing secrets to a principal's public key.
//!
//! Anyone holding a principal's X25519 public key can seal a collection
//! secret for them; only the principal's unlocked private key can open it.
//! This is what lets distribution write into keyrings of principals who are
//! not logged in.

use serde::{Deserialize, Serialize};

use crate::crypto::{AeadNonce, KeyringPrivateKey, KeyringPublicKey};
use crate::error::Result;
use crate::secret::Secret;
use crate::types::CollectionId;

/// A collection secret encrypted for one keyring.
///
/// The wrap key comes from an ephemeral exchange with the keyring's public
/// key and is bound to the collection identifier, so an entry copied under
/// another identifier fails to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedSecret {
    ephemeral: KeyringPublicKey,
    nonce: AeadNonce,
    ciphertext: Vec<u8>,
}

impl SealedSecret {
    /// Seal the key of `collection` to the owner of `keyring`.
    pub fn seal(collection: &CollectionId, secret: &Secret, keyring: &KeyringPublicKey) -> Result<Self> {
        let (ephemeral, wrap_key) = keyring.wrap_key(collection);
        let (nonce, ciphertext) = wrap_key.seal(secret.expose())?;
        Ok(Self {
            ephemeral,
            nonce,
            ciphertext,
        })
    }

    /// Recover the secret with the owner's private key.
    ///
    /// Fails if the entry was sealed to another keyring or for another collection.
    pub fn open(&self, collection: &CollectionId, private: &KeyringPrivateKey) -> Result<Secret> {
        let wrap_key = private.unwrap_key(&self.ephemeral, collection);
        let bytes = wrap_key.open(&self.nonce, &self.ciphertext)?;
        Ok(Secret::new(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(id: &str) -> CollectionId {
        CollectionId::new(id).unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let recipient = KeyringPrivateKey::generate();
        let secret = Secret::generate();

        let sealed = SealedSecret::seal(&collection("138"), &secret, &recipient.public_key()).unwrap();
        let opened = sealed.open(&collection("138"), &recipient).unwrap();

        assert_eq!(opened, secret);
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let recipient = KeyringPrivateKey::generate();
        let intruder = KeyringPrivateKey::generate();

        let sealed =
            SealedSecret::seal(&collection("138"), &Secret::generate(), &recipient.public_key())
                .unwrap();

        assert!(sealed.open(&collection("138"), &intruder).is_err());
    }

    #[test]
    fn test_bound_to_collection() {
        let recipient = KeyringPrivateKey::generate();
        let sealed =
            SealedSecret::seal(&collection("138"), &Secret::generate(), &recipient.public_key())
                .unwrap();

        assert!(sealed.open(&collection("666"), &recipient).is_err());
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

        #[test]
        fn prop_any_secret_survives_sealing(
            bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 1..256),
        ) {
            let recipient = KeyringPrivateKey::generate();
            let secret = Secret::new(bytes).unwrap();

            let sealed = SealedSecret::seal(&collection("138"), &secret, &recipient.public_key()).unwrap();

            proptest::prop_assert_eq!(sealed.open(&collection("138"), &recipient).unwrap(), secret);
        }
    }
}
