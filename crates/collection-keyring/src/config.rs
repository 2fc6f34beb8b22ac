//! Keyring configuration and the runtime migration flag.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use keyring_core::{CollectionId, KdfParams};
use serde::{Deserialize, Serialize};

/// Configuration for a [`KeyringService`](crate::KeyringService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyringConfig {
    /// Initial value of the central flag: serve reads from the central keyring.
    pub central_enabled: bool,

    /// Keyring entries copied into the application keys cache on login.
    pub application_keys: BTreeSet<CollectionId>,

    /// Argon2id costs for newly created keyrings.
    pub kdf: KdfParams,
}

impl Default for KeyringConfig {
    fn default() -> Self {
        Self {
            central_enabled: false,
            application_keys: BTreeSet::new(),
            kdf: KdfParams::default(),
        }
    }
}

impl KeyringConfig {
    /// Set the initial central flag.
    pub fn with_central_enabled(mut self, enabled: bool) -> Self {
        self.central_enabled = enabled;
        self
    }

    /// Register an application key name.
    pub fn with_application_key(mut self, name: CollectionId) -> Self {
        self.application_keys.insert(name);
        self
    }

    /// Set the KDF costs for new keyrings.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }
}

/// A shared, runtime-toggleable switch between the legacy and central keyrings.
///
/// Clones share state: flipping one flips all.
#[derive(Debug, Clone, Default)]
pub struct CentralFlag(Arc<AtomicBool>);

impl CentralFlag {
    /// Create a flag with the given initial value.
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    /// Whether reads are served by the central keyring.
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set the flag.
    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }
}
