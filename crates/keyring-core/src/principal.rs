//! Principals: user accounts that own a personal keyring.

use crate::crypto::KdfParams;
use crate::error::Result;
use crate::personal::{PersonalKeyring, SealedKeyring};
use crate::types::Email;

/// A user account capable of holding a personal keyring.
#[derive(Debug, Clone)]
pub struct Principal {
    /// The principal's identity.
    pub email: Email,
    /// The principal's keyring, with its current lock state.
    pub keyring: PersonalKeyring,
}

impl Principal {
    /// Create a new account with an empty, unlocked keyring.
    pub fn create(email: Email, password: &str, kdf: KdfParams) -> Result<Self> {
        Ok(Self {
            email,
            keyring: PersonalKeyring::create(password, kdf)?,
        })
    }

    /// Rebuild a principal from its persisted record. The keyring is locked.
    pub fn from_record(email: Email, sealed: SealedKeyring) -> Self {
        Self {
            email,
            keyring: PersonalKeyring::from_sealed(sealed),
        }
    }

    /// Unlock this principal's keyring.
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        self.keyring.unlock(password)
    }

    /// A copy of this principal as loaded from storage: same entries, locked.
    pub fn locked(&self) -> Self {
        Self::from_record(self.email.clone(), self.keyring.sealed().clone())
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.email == other.email
    }
}

impl Eq for Principal {}
