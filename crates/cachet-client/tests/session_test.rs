//! Login ladder, recovery, and re-key behavior.

mod support;

use cachet_client::{
    CryptoSession, KeyStore, LoginOutcome, MemoryKeyStore, SessionError, UserId,
};
use cachet_crypto::CryptoError;
use support::{MockDirectory, SeededEnv};

const USER: UserId = 42;
const PASSWORD: &str = "correct horse battery staple";

#[tokio::test]
async fn first_login_registers_a_fresh_key_pair() {
    let directory = MockDirectory::new();
    let store = MemoryKeyStore::new();

    let (session, outcome) =
        CryptoSession::login(SeededEnv::new(1), store, directory.clone(), USER, PASSWORD)
            .await
            .unwrap();

    assert_eq!(outcome, LoginOutcome::Registered);
    let published = directory.public_key_of(USER).unwrap();
    assert_eq!(&published.import().unwrap(), session.public_key());
    assert!(directory.backup_of(USER).is_some());
}

#[tokio::test]
async fn second_login_on_the_same_device_uses_the_stored_pair() {
    let directory = MockDirectory::new();
    let store = MemoryKeyStore::new();

    let (first, outcome) =
        CryptoSession::login(SeededEnv::new(2), store.clone(), directory.clone(), USER, PASSWORD)
            .await
            .unwrap();
    assert_eq!(outcome, LoginOutcome::Registered);
    let original_key = *first.public_key();
    drop(first);

    let (second, outcome) =
        CryptoSession::login(SeededEnv::new(3), store, directory, USER, PASSWORD).await.unwrap();
    assert_eq!(outcome, LoginOutcome::Existing);
    assert_eq!(*second.public_key(), original_key);
}

#[tokio::test]
async fn new_device_recovers_the_key_pair_from_the_backup() {
    let directory = MockDirectory::new();

    let (original, _) = CryptoSession::login(
        SeededEnv::new(4),
        MemoryKeyStore::new(),
        directory.clone(),
        USER,
        PASSWORD,
    )
    .await
    .unwrap();
    let original_key = *original.public_key();
    drop(original);

    // Fresh store simulates a brand-new device.
    let new_store = MemoryKeyStore::new();
    let (recovered, outcome) = CryptoSession::login(
        SeededEnv::new(5),
        new_store.clone(),
        directory,
        USER,
        PASSWORD,
    )
    .await
    .unwrap();

    assert_eq!(outcome, LoginOutcome::Recovered);
    assert_eq!(*recovered.public_key(), original_key);
    // The recovered pair was persisted locally for next time.
    assert!(new_store.load(USER).unwrap().is_some());
}

#[tokio::test]
async fn wrong_password_on_a_new_device_fails_recovery() {
    let directory = MockDirectory::new();
    CryptoSession::login(
        SeededEnv::new(6),
        MemoryKeyStore::new(),
        directory.clone(),
        USER,
        PASSWORD,
    )
    .await
    .unwrap();

    let result = CryptoSession::login(
        SeededEnv::new(7),
        MemoryKeyStore::new(),
        directory,
        USER,
        "not my password",
    )
    .await;

    assert!(matches!(result, Err(SessionError::Crypto(CryptoError::Recovery))));
}

#[tokio::test]
async fn rekey_publishes_a_new_key_and_backup() {
    let directory = MockDirectory::new();
    let (mut session, _) = CryptoSession::login(
        SeededEnv::new(8),
        MemoryKeyStore::new(),
        directory.clone(),
        USER,
        PASSWORD,
    )
    .await
    .unwrap();
    let old_key = *session.public_key();

    session.rekey(PASSWORD).await.unwrap();
    let new_key = *session.public_key();
    assert_ne!(new_key, old_key);
    assert_eq!(directory.public_key_of(USER).unwrap().import().unwrap(), new_key);

    // A new device now recovers the rotated pair, not the old one.
    let (fresh, outcome) = CryptoSession::login(
        SeededEnv::new(9),
        MemoryKeyStore::new(),
        directory,
        USER,
        PASSWORD,
    )
    .await
    .unwrap();
    assert_eq!(outcome, LoginOutcome::Recovered);
    assert_eq!(*fresh.public_key(), new_key);
}

#[tokio::test]
async fn backup_fetch_survives_one_transient_failure() {
    let directory = MockDirectory::new();
    CryptoSession::login(
        SeededEnv::new(10),
        MemoryKeyStore::new(),
        directory.clone(),
        USER,
        PASSWORD,
    )
    .await
    .unwrap();

    directory.fail_next_requests(1);
    let (_, outcome) = CryptoSession::login(
        SeededEnv::new(11),
        MemoryKeyStore::new(),
        directory,
        USER,
        PASSWORD,
    )
    .await
    .unwrap();
    assert_eq!(outcome, LoginOutcome::Recovered);
}

#[tokio::test]
async fn unreachable_directory_at_login_is_key_unavailable() {
    let directory = MockDirectory::new();
    directory.fail_next_requests(2);

    let result = CryptoSession::login(
        SeededEnv::new(12),
        MemoryKeyStore::new(),
        directory,
        USER,
        PASSWORD,
    )
    .await;

    assert!(matches!(result, Err(SessionError::KeyUnavailable { .. })));
}
