//! Service wiring: configuration, accounts and logins end to end.

mod common;

use collection_keyring::{ErrorKind, KeyringConfig, KeyringError, Phase};
use common::World;
use keyring_core::{Email, Secret};
use keyring_testkit::{collection, collection_id};

#[test]
fn test_service_starts_from_json_config() {
    let config: KeyringConfig = serde_json::from_str(
        r#"{ "central_enabled": true, "application_keys": ["reader-app"] }"#,
    )
    .unwrap();
    let world = World::with_config(config);

    assert!(world.service.flag().is_enabled());
    assert!(world
        .service
        .application_keys()
        .is_application_key(&collection_id("reader-app")));
}

#[test]
fn test_created_principal_receives_keys_and_logs_in() {
    let world = World::new();
    let email = Email::new("grover@sesame.street").unwrap();
    let grover = world.service.create_principal(email.clone(), "near far").unwrap();
    assert!(grover.keyring.is_unlocked());

    world.permissions.set(&collection_id("138"), [&email]);
    let key = Secret::generate();
    world.service.add(&collection("138"), &key).unwrap();

    world.sessions.login(&email);
    let mut fresh = world.stored(&grover);
    assert!(!fresh.keyring.is_unlocked());
    world.service.login(&mut fresh, "near far").unwrap();

    assert_eq!(world.service.get(&fresh, &collection("138")).unwrap(), Some(key));
    assert_eq!(
        world.service.list(&fresh).unwrap().into_iter().collect::<Vec<_>>(),
        vec![collection_id("138")]
    );
}

#[test]
fn test_duplicate_principal_is_rejected() {
    let world = World::new();
    let email = world.cast.bert.email.clone();

    let err = world.service.create_principal(email, "again").unwrap_err();

    assert!(matches!(err, KeyringError::UpdateFailed { .. }));
    assert_eq!(err.phase(), Some(Phase::UpdateKeyring));
    assert_eq!(err.kind(), ErrorKind::Upstream);
}

#[test]
fn test_flipping_the_flag_switches_reads_without_backfill() {
    let world = World::new();
    let cast = &world.cast;
    world.permissions.set(&collection_id("138"), [&cast.bert.email]);
    let bert = world.login(&cast.bert);
    let key = Secret::generate();

    world.service.add(&collection("138"), &key).unwrap();
    assert_eq!(world.service.get(&bert, &collection("138")).unwrap(), Some(key.clone()));
    assert_eq!(world.service.get(&cast.ernie, &collection("138")).unwrap(), None);

    world.service.set_central_enabled(true);
    assert_eq!(world.service.get(&cast.ernie, &collection("138")).unwrap(), Some(key));
}
