//! # Keyring Store
//!
//! Storage abstraction for collection keyrings. Provides trait-based
//! interfaces for key persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! Two stores back the keyrings:
//!
//! - [`KeyStore`] - the durable key store of the central model, one
//!   write-once secret per collection
//! - [`UserDirectory`] - every principal's sealed personal keyring, used by
//!   the legacy distribution model
//!
//! The primary implementations are [`SqliteKeyStore`] and
//! [`SqliteUserDirectory`], with [`MemoryKeyStore`] and
//! [`MemoryUserDirectory`] for testing.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keyring_core::{CollectionId, EncryptionKey, Secret};
//! use keyring_store::{KeyStore, SqliteKeyStore, WriteResult};
//!
//! let store = SqliteKeyStore::open("keys.db", EncryptionKey::generate()).unwrap();
//! let id = CollectionId::new("138").unwrap();
//!
//! let result = store.write(&id, &Secret::generate()).unwrap();
//! assert_eq!(result, WriteResult::Written);
//! ```
//!
//! ## Design Notes
//!
//! - **Write-once keys**: writing the same secret twice returns `AlreadyExists`
//! - **Conflict detection**: a different secret for a stored collection returns
//!   `Conflict` and leaves the stored secret untouched
//! - **Sealed at rest**: keyrings are stored sealed; the directory never sees
//!   a password

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryKeyStore, MemoryUserDirectory};
pub use sqlite::{SqliteKeyStore, SqliteUserDirectory};
pub use traits::{KeyStore, KeyStoreExt, UserDirectory, WriteResult};
