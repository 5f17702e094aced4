/*
    Store subsystem - Keys, encryption and persistence of vault state
*/

pub mod codec;
pub mod encryption;
pub mod errors;
pub mod keys;
pub mod record_store;
pub mod state;
pub mod vault;

pub use codec::{LoadOutcome, PersistenceCodec};
pub use encryption::Cipher;
pub use errors::*;
pub use keys::{KeyManager, VaultKey, VaultLocation};
pub use record_store::{RecordStore, Upsert};
pub use state::{VaultState, VaultStats};
pub use vault::{CorruptStatePolicy, GrantStatus, SharedVault, Vault, VaultOptions};
