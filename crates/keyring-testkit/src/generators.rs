//! Proptest generators for property-based testing.

use proptest::prelude::*;

use keyring_core::{CollectionDescription, CollectionId, Email, Secret};

/// Generate a valid collection identifier.
pub fn collection_id() -> impl Strategy<Value = CollectionId> {
    "[a-z0-9][a-z0-9-]{0,15}".prop_map(|id| CollectionId::new(id).unwrap())
}

/// Generate a collection descriptor.
pub fn collection() -> impl Strategy<Value = CollectionDescription> {
    collection_id().prop_map(|id| {
        let name = format!("collection {}", id);
        CollectionDescription::new(id, name)
    })
}

/// Generate a valid email.
pub fn email() -> impl Strategy<Value = Email> {
    "[a-z]{1,10}@[a-z]{1,10}\\.test".prop_map(|email| Email::new(email).unwrap())
}

/// Generate a non-empty secret of up to `max_len` bytes.
pub fn secret(max_len: usize) -> impl Strategy<Value = Secret> {
    prop::collection::vec(any::<u8>(), 1..=max_len.max(1)).prop_map(|bytes| Secret::new(bytes).unwrap())
}

/// A starting state for convergence tests over `principals` principals.
#[derive(Debug, Clone)]
pub struct DistributionCase {
    /// Which principals are in the Recipient Set.
    pub recipients: Vec<bool>,
    /// Which principals already hold the key being distributed.
    pub holds_current: Vec<bool>,
    /// Which principals hold a stale, different key for the collection.
    pub holds_stale: Vec<bool>,
    /// Which principals have an active, cached session.
    pub logged_in: Vec<bool>,
}

/// Generate a distribution case for `principals` principals.
pub fn distribution_case(principals: usize) -> impl Strategy<Value = DistributionCase> {
    let flags = move || prop::collection::vec(any::<bool>(), principals);
    (flags(), flags(), flags(), flags()).prop_map(|(recipients, holds_current, holds_stale, logged_in)| {
        DistributionCase {
            recipients,
            holds_current,
            holds_stale,
            logged_in,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_secrets_are_non_empty(secret in secret(64)) {
            prop_assert!(!secret.is_empty());
            prop_assert!(secret.len() <= 64);
        }

        #[test]
        fn distribution_case_has_one_flag_per_principal(case in distribution_case(5)) {
            prop_assert_eq!(case.recipients.len(), 5);
            prop_assert_eq!(case.holds_current.len(), 5);
            prop_assert_eq!(case.holds_stale.len(), 5);
            prop_assert_eq!(case.logged_in.len(), 5);
        }
    }
}
