/*
    Integration tests for core_vault

    Test suite covering:
    - Persistence, reopen and corruption handling
    - Peer merge edge cases
    - Store/search/grant properties
*/

use crate::core_vault::model::{Document, ManualClock, Timestamp};
use crate::core_vault::store::{Vault, VaultLocation, VaultOptions};
use std::path::Path;
use std::sync::Arc;

pub mod persistence_tests;
pub mod property_tests;

/// Open `name` under `dir` with a manual clock
pub fn open_vault(dir: &Path, name: &str, clock: &ManualClock) -> Vault {
    Vault::open_with(
        VaultLocation::in_dir(dir, name),
        VaultOptions {
            clock: Arc::new(clock.clone()),
            ..VaultOptions::default()
        },
    )
    .unwrap()
}

pub fn text_doc(text: &str) -> Document {
    Document::new().with("content", text)
}

pub fn at(millis: u64) -> ManualClock {
    ManualClock::new(Timestamp::from_millis(millis))
}
