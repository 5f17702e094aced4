/*
    remote.rs - Boundary to a peer vault

    A peer hands over its state in plaintext; each location has its own key,
    so adopted records are re-encrypted locally by the merge. How the state
    travels is up to the RemoteSource implementation. The in-process peer is
    another SharedVault on the same machine.
*/

use crate::core_vault::access::AccessLedger;
use crate::core_vault::model::{Document, Metadata, RecordId, Timestamp};
use crate::core_vault::store::errors::StoreResult;
use crate::core_vault::store::SharedVault;
use serde::{Deserialize, Serialize};

/// One record of a peer export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: RecordId,
    pub content: Document,
    pub metadata: Metadata,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Snapshot of a peer vault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteState {
    /// Peer name, for logs
    pub source: String,
    /// Records in id order
    pub records: Vec<RemoteRecord>,
    pub access: AccessLedger,
    /// Records the peer could not decrypt and left out
    pub undecryptable: usize,
}

impl RemoteState {
    pub fn empty(source: impl Into<String>) -> Self {
        RemoteState {
            source: source.into(),
            records: Vec::new(),
            access: AccessLedger::new(),
            undecryptable: 0,
        }
    }
}

/// Something a vault can pull state from
pub trait RemoteSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_state(&self) -> StoreResult<RemoteState>;
}

impl RemoteSource for SharedVault {
    fn name(&self) -> &str {
        SharedVault::name(self)
    }

    /// Snapshot under the peer's lock; the lock is released on return
    fn fetch_state(&self) -> StoreResult<RemoteState> {
        Ok(self.lock()?.export())
    }
}

/// A fixed snapshot, e.g. one already received over the wire
impl RemoteSource for RemoteState {
    fn name(&self) -> &str {
        &self.source
    }

    fn fetch_state(&self) -> StoreResult<RemoteState> {
        Ok(self.clone())
    }
}
