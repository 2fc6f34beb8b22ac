//! Interfaces of the external collaborators consumed by the keyrings.
//!
//! Permission computation and session authentication live outside this
//! workspace. Their failures are opaque to us and are reported as
//! [`anyhow::Error`]; the keyring layer wraps them with the phase that failed.

use std::collections::BTreeSet;

use crate::types::{CollectionDescription, Email, Session};

/// Computes who may access a collection.
pub trait PermissionService: Send + Sync {
    /// The Recipient Set: every principal currently allowed to access
    /// `collection`.
    ///
    /// Called fresh on every distribution; never cached. An empty set is
    /// valid and means nobody should hold the collection key.
    fn access_mapping(&self, collection: &CollectionDescription) -> anyhow::Result<BTreeSet<Email>>;
}

/// Looks up active login sessions.
pub trait SessionService: Send + Sync {
    /// The active session of `email`, if the principal is logged in.
    fn find(&self, email: &Email) -> anyhow::Result<Option<Session>>;
}
