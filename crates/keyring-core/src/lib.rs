//! # Keyring Core
//!
//! Pure primitives for collection keyrings: identifiers, opaque secrets,
//! sealing, and the personal keyring lock state machine.
//!
//! This crate contains no I/O, no storage, no caches. It is pure computation
//! over keys and sealed data structures.
//!
//! ## Key Types
//!
//! - [`CollectionId`], [`Email`], [`SessionId`] - validated identifiers
//! - [`Secret`] - an opaque collection key
//! - [`SealedKeyring`] - the persisted, encrypted personal keyring
//! - [`PersonalKeyring`] - a keyring plus its [`LockState`]
//! - [`Principal`] - an account owning a keyring
//!
//! ## Collaborators
//!
//! [`PermissionService`] and [`SessionService`] describe the external
//! services the distribution engine consults. They are defined here so test
//! doubles can be written without depending on the engine.

pub mod collaborators;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod personal;
pub mod principal;
pub mod seal;
pub mod secret;
pub mod types;
pub mod validation;

pub use collaborators::{PermissionService, SessionService};
pub use crypto::{AeadNonce, EncryptionKey, KdfParams, KeyringPrivateKey, KeyringPublicKey, Salt};
pub use envelope::{EncryptedPayload, PasswordProtected};
pub use error::{CoreError, Result, ValidationError};
pub use personal::{DecryptedKeyring, LockState, PersonalKeyring, SealedEntry, SealedKeyring};
pub use principal::Principal;
pub use seal::SealedSecret;
pub use secret::{Fingerprint, Secret};
pub use types::{CollectionDescription, CollectionId, Email, Session, SessionId};
