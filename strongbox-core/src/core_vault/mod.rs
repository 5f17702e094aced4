/*
    core_vault - Encrypted record vault

    Single-node encrypted record store. Handles:
    - Content-addressed records encrypted at rest under a per-location key
    - Full-text lookup over record contents
    - Time-bounded per-record access grants
    - Last-write-wins reconciliation with a peer copy
    - Atomic, versioned persistence of the whole vault state
*/

pub mod access;
pub mod model;
pub mod query;
pub mod session;
pub mod store;
pub mod sync;

#[cfg(test)]
pub mod tests;

// Re-export commonly used types
pub use access::AccessLedger;
pub use model::{
    AccessGrant, Clock, Document, FieldValue, ManualClock, Metadata, RecipientId, RecordId,
    RecordSummary, StoredRecord, SystemClock, Timestamp,
};
pub use query::SearchIndex;
pub use session::Session;
pub use store::{
    CorruptStatePolicy, GrantStatus, SharedVault, StoreError, StoreResult, ValidationError, Vault,
    VaultLocation, VaultOptions, VaultStats,
};
pub use sync::{MergeReport, RemoteSource, RemoteState, SyncEngine};
