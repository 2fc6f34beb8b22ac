//! The migration keyring: legacy and central side by side.
//!
//! While the central keyring is rolled out both keyrings are kept warm.
//! Reads follow the [`CentralFlag`]; every write goes to both, legacy first,
//! so the flag can be flipped at any time without a backfill.

use std::collections::BTreeSet;

use keyring_core::{CollectionDescription, CollectionId, Principal, Secret};
use tracing::{debug, warn};

use crate::config::CentralFlag;
use crate::error::Result;
use crate::keyring::CollectionKeyring;

/// Decorator composing a legacy and a central keyring.
pub struct MigrationKeyring<L, C> {
    legacy: L,
    central: C,
    flag: CentralFlag,
}

impl<L: CollectionKeyring, C: CollectionKeyring> MigrationKeyring<L, C> {
    /// Compose `legacy` and `central`, reading from the one `flag` selects.
    pub fn new(legacy: L, central: C, flag: CentralFlag) -> Self {
        Self {
            legacy,
            central,
            flag,
        }
    }

    /// The legacy keyring.
    pub fn legacy(&self) -> &L {
        &self.legacy
    }

    /// The central keyring.
    pub fn central(&self) -> &C {
        &self.central
    }

    /// The flag selecting the read path.
    pub fn flag(&self) -> &CentralFlag {
        &self.flag
    }

    /// Run `op` on legacy, then on central. A legacy failure skips central.
    fn both(&self, op: &str, mut f: impl FnMut(&dyn CollectionKeyring) -> Result<()>) -> Result<()> {
        f(&self.legacy).map_err(|err| {
            warn!(op, error = %err, "legacy keyring failed, central skipped");
            err
        })?;
        f(&self.central).map_err(|err| {
            warn!(op, error = %err, "central keyring failed after legacy succeeded");
            err
        })
    }
}

impl<L: CollectionKeyring, C: CollectionKeyring> CollectionKeyring for MigrationKeyring<L, C> {
    fn get(
        &self,
        principal: &Principal,
        collection: &CollectionDescription,
    ) -> Result<Option<Secret>> {
        if self.flag.is_enabled() {
            self.central.get(principal, collection)
        } else {
            self.legacy.get(principal, collection)
        }
    }

    fn add(&self, collection: &CollectionDescription, secret: &Secret) -> Result<()> {
        self.both("add", |keyring| keyring.add(collection, secret))
    }

    fn remove(&self, collection: &CollectionDescription) -> Result<()> {
        self.both("remove", |keyring| keyring.remove(collection))
    }

    fn list(&self, principal: &Principal) -> Result<BTreeSet<CollectionId>> {
        if self.flag.is_enabled() {
            self.central.list(principal)
        } else {
            self.legacy.list(principal)
        }
    }

    fn populate_from_user(&self, principal: &Principal) -> Result<()> {
        self.both("populate", |keyring| keyring.populate_from_user(principal))?;
        debug!(email = %principal.email, "keyrings populated");
        Ok(())
    }
}
