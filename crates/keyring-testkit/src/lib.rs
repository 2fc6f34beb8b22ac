//! # Keyring Testkit
//!
//! Testing utilities for collection keyrings.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: in-memory permission and session services, failure
//!   injecting wrappers for the stores, and the Sesame cast of principals
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use keyring_store::MemoryUserDirectory;
//! use keyring_testkit::fixtures::{MemorySessions, Sesame};
//!
//! let cast = Sesame::new();
//! let directory = MemoryUserDirectory::new();
//! cast.register_all(&directory);
//!
//! let sessions = MemorySessions::new();
//! let session = sessions.login(&cast.bert.email);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use keyring_testkit::generators::{distribution_case, DistributionCase};
//!
//! proptest! {
//!     #[test]
//!     fn add_converges(case in distribution_case(4)) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    collection, collection_id, FailingDirectory, FailingKeyStore, MemorySessions, Sesame,
    StaticPermissions, SESAME_PASSWORD,
};
pub use generators::{distribution_case, DistributionCase};
