//! Strong type definitions for collection keyrings.
//!
//! All identifiers are validated newtypes: holding a [`CollectionId`] means the
//! identifier is non-empty, so downstream code never re-checks it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::validation::{validate_collection_id, validate_email, validate_session_id};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $validate:path) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new validated identifier.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                $validate(&value)?;
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ValidationError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// Identifier of a collection; the key under which its secret is held.
    CollectionId,
    validate_collection_id
);

string_id!(
    /// A principal's email address, the principal's stable identity.
    Email,
    validate_email
);

string_id!(
    /// Identifier of a login session.
    SessionId,
    validate_session_id
);

/// An active login session, as reported by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    /// Session identifier (the Session Keyring Cache key).
    pub id: SessionId,
    /// The principal this session belongs to.
    pub email: Email,
}

impl Session {
    /// Create a session record.
    pub fn new(id: SessionId, email: Email) -> Self {
        Self { id, email }
    }
}

/// Descriptor of a collection, as handed over by the collection lifecycle.
///
/// The permission collaborator computes recipients from this descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescription {
    /// The collection identifier.
    pub id: CollectionId,
    /// Human-readable name, informational only.
    pub name: String,
}

impl CollectionDescription {
    /// Create a descriptor with the given identifier and name.
    pub fn new(id: CollectionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Create a descriptor from a raw identifier, using the identifier as name.
    pub fn from_id(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = CollectionId::new(id)?;
        let name = id.as_str().to_owned();
        Ok(Self { id, name })
    }
}
