//! # Collection Keyring
//!
//! Distribution of per-collection encryption keys to the principals allowed
//! to access each collection, and the live migration from per-principal
//! keyrings to a central key store.
//!
//! ## Key Types
//!
//! - [`CollectionKeyring`] - the capability trait: `get`, `add`, `remove`,
//!   `list`, `populate_from_user`
//! - [`LegacyKeyring`] - diff-and-reconcile distribution into every
//!   authorized principal's personal keyring
//! - [`CentralKeyring`] - one write-once key per collection in a durable store
//! - [`MigrationKeyring`] - runs both, reads selected by a [`CentralFlag`]
//! - [`KeyringService`] - the composition root wiring caches, keyrings and
//!   collaborators together
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use collection_keyring::{Collaborators, KeyringConfig, KeyringService};
//! use keyring_core::{CollectionDescription, Secret};
//! use keyring_store::{MemoryKeyStore, MemoryUserDirectory};
//! # fn services() -> (Arc<dyn keyring_core::PermissionService>, Arc<dyn keyring_core::SessionService>) { unimplemented!() }
//!
//! let (permissions, sessions) = services();
//! let collaborators = Collaborators {
//!     directory: Arc::new(MemoryUserDirectory::new()),
//!     permissions,
//!     sessions,
//! };
//! let service = KeyringService::new(KeyringConfig::default(), collaborators, MemoryKeyStore::new());
//!
//! let collection = CollectionDescription::from_id("138").unwrap();
//! service.add(&collection, &Secret::generate()).unwrap();
//! ```
//!
//! ## Design Notes
//!
//! - **No rollback**: distribution halts on the first failing principal and
//!   leaves earlier principals updated; re-running converges.
//! - **Idempotent**: principals already holding the key cause no writes.
//! - **Immutable central keys**: a different key for an established
//!   collection is a [`KeyringError::KeyMismatch`], never an overwrite.
//! - **Soft reads**: `get` returns `None` for missing sessions, cache
//!   entries, keys and locked keyrings; mutators raise typed errors.

pub mod cache;
pub mod central;
pub mod config;
pub mod error;
pub mod keyring;
pub mod legacy;
pub mod migration;
pub mod service;

pub use cache::{
    ApplicationKeyCache, KeyCache, KeyringCaches, SchedulerKeyCache, SessionKeyringCache,
};
pub use central::CentralKeyring;
pub use config::{CentralFlag, KeyringConfig};
pub use error::{ErrorKind, KeyringError, Phase, Result};
pub use keyring::CollectionKeyring;
pub use legacy::{Collaborators, LegacyKeyring};
pub use migration::MigrationKeyring;
pub use service::{KeyringService, ServiceKeyring};
