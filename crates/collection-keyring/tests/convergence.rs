//! Property: a successful `add` leaves exactly the Recipient Set holding the
//! key, and running it again writes nothing.

mod common;

use collection_keyring::CollectionKeyring;
use common::World;
use keyring_core::{Email, KdfParams, Principal, Secret};
use keyring_store::UserDirectory;
use keyring_testkit::{collection, collection_id, distribution_case, SESAME_PASSWORD};
use proptest::prelude::*;

const PRINCIPALS: usize = 4;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_add_converges_to_the_recipient_set(case in distribution_case(PRINCIPALS)) {
        let world = World::new();
        let id = collection_id("138");
        let key = Secret::generate();

        let principals: Vec<Principal> = (0..PRINCIPALS)
            .map(|i| {
                let email = Email::new(format!("p{}@sesame.street", i)).unwrap();
                let principal = Principal::create(email, SESAME_PASSWORD, KdfParams::minimal()).unwrap();
                world.directory.register(&principal).unwrap();
                principal
            })
            .collect();

        for (i, principal) in principals.iter().enumerate() {
            if case.holds_stale[i] {
                world.seed(principal, &id, &Secret::generate());
            }
            if case.holds_current[i] {
                world.seed(principal, &id, &key);
            }
        }

        let principals: Vec<Principal> = principals
            .iter()
            .enumerate()
            .map(|(i, principal)| {
                if case.logged_in[i] {
                    world.login_legacy(principal)
                } else {
                    world.stored(principal)
                }
            })
            .collect();

        let recipients: Vec<&Email> = principals
            .iter()
            .enumerate()
            .filter(|(i, _)| case.recipients[*i])
            .map(|(_, principal)| &principal.email)
            .collect();
        world.permissions.set(&id, recipients);

        world.service.legacy().add(&collection("138"), &key).unwrap();

        for (i, principal) in principals.iter().enumerate() {
            let stored = world.stored(principal);
            if case.recipients[i] {
                prop_assert!(stored.keyring.holds(&id, &key));
            } else {
                prop_assert!(!stored.keyring.contains(&id));
            }

            if case.logged_in[i] {
                let expected = case.recipients[i].then(|| key.clone());
                prop_assert_eq!(world.cached(principal, &collection("138")), expected);
            }
        }

        let writes = world.writes();
        world.service.legacy().add(&collection("138"), &key).unwrap();
        prop_assert_eq!(world.writes(), writes);
    }
}
