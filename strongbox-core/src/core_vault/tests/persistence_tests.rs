/*
    persistence_tests.rs - Durability of vault state across reopen

    Validates that everything a vault holds survives a restart, that the key
    stays bound to its location, and that unreadable state is never mistaken
    for an empty vault.
*/

use super::{at, open_vault, text_doc};
use crate::core_vault::model::{Metadata, RecipientId, Timestamp};
use crate::core_vault::store::{
    CorruptStatePolicy, KeyManager, StoreError, Vault, VaultLocation, VaultOptions,
};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_full_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let clock = at(5_000);
    let bob = RecipientId::new("bob");

    let mut meta = Metadata::new();
    meta.insert("file_name".to_string(), "notes.txt".to_string());

    let (id, stats) = {
        let mut vault = open_vault(dir.path(), "local", &clock);
        let id = vault
            .store_and_share(&text_doc("Meeting Notes"), Some(meta.clone()), &[bob.clone()], Some(3))
            .unwrap();
        vault.store(&text_doc("other file"), None).unwrap();
        (id, vault.stats())
    };

    let vault = open_vault(dir.path(), "local", &clock);
    assert_eq!(vault.stats(), stats);
    assert_eq!(vault.retrieve(&id).unwrap(), Some(text_doc("Meeting Notes")));
    assert!(vault.has_access(&id, &bob));
    assert_eq!(vault.search("meeting").unwrap().len(), 1);

    let summary = vault.list().into_iter().find(|s| s.id == id).unwrap();
    assert_eq!(summary.metadata, meta);
    assert_eq!(summary.created_at, Timestamp::from_millis(5_000));
}

#[test]
fn test_key_is_stable_per_location() {
    let dir = tempdir().unwrap();
    let location = VaultLocation::in_dir(dir.path(), "local");

    let first = KeyManager::load_or_create(&location).unwrap();
    let second = KeyManager::load_or_create(&location).unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());

    let other = KeyManager::load_or_create(&VaultLocation::in_dir(dir.path(), "cloud")).unwrap();
    assert_ne!(first.as_bytes(), other.as_bytes());
}

#[test]
fn test_lost_key_makes_state_corrupt() {
    let dir = tempdir().unwrap();
    let clock = at(1);
    let location = VaultLocation::in_dir(dir.path(), "local");
    open_vault(dir.path(), "local", &clock).store(&text_doc("x"), None).unwrap();

    // A new key is generated, the old state no longer opens
    fs::remove_file(location.key_path()).unwrap();
    assert!(matches!(Vault::open(location), Err(StoreError::CorruptState(_))));
}

#[test]
fn test_short_key_file_is_rejected() {
    let dir = tempdir().unwrap();
    let location = VaultLocation::in_dir(dir.path(), "local");
    fs::write(location.key_path(), [7u8; 16]).unwrap();

    assert!(matches!(Vault::open(location), Err(StoreError::InvalidKey(_))));
}

#[test]
fn test_single_flipped_byte_never_loads_as_empty() {
    let dir = tempdir().unwrap();
    let clock = at(1);
    let location = VaultLocation::in_dir(dir.path(), "local");
    open_vault(dir.path(), "local", &clock).store(&text_doc("precious"), None).unwrap();

    let original = fs::read(location.state_path()).unwrap();
    for offset in (0..original.len()).step_by(7) {
        let mut data = original.clone();
        data[offset] ^= 0x80;
        fs::write(location.state_path(), &data).unwrap();

        let result = Vault::open(location.clone());
        assert!(
            matches!(result, Err(StoreError::CorruptState(_))),
            "flip at {} was not detected",
            offset
        );
    }
}

#[test]
fn test_quarantine_then_continue_working() {
    let dir = tempdir().unwrap();
    let clock = at(77);
    let location = VaultLocation::in_dir(dir.path(), "local");
    fs::write(location.state_path(), b"not a vault").unwrap();

    let options = VaultOptions {
        corrupt_policy: CorruptStatePolicy::Quarantine,
        clock: Arc::new(clock.clone()),
    };
    let mut vault = Vault::open_with(location.clone(), options.clone()).unwrap();
    let id = vault.store(&text_doc("fresh start"), None).unwrap();
    drop(vault);

    let mut quarantined = location.state_path().into_os_string();
    quarantined.push(".corrupt-77");
    assert_eq!(fs::read(&quarantined).unwrap(), b"not a vault");

    let vault = Vault::open_with(location, options).unwrap();
    assert!(vault.retrieve(&id).unwrap().is_some());
}

#[test]
fn test_no_temp_file_left_behind() {
    let dir = tempdir().unwrap();
    let clock = at(1);
    let mut vault = open_vault(dir.path(), "local", &clock);
    for i in 0..5 {
        vault.store(&text_doc(&format!("entry {}", i)), None).unwrap();
    }

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_rebuild_index_repairs_search() {
    let dir = tempdir().unwrap();
    let clock = at(1);
    let mut vault = open_vault(dir.path(), "local", &clock);
    let id = vault.store(&text_doc("Annual Budget"), None).unwrap();

    assert_eq!(vault.rebuild_index().unwrap(), 0);
    let hits = vault.search("budget").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, id);
}
