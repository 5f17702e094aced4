/*
    state.rs - The unit of persistence

    Records, access ledger and search index always travel together: they
    are saved, loaded and merged as one VaultState.
*/

use crate::core_vault::access::AccessLedger;
use crate::core_vault::query::SearchIndex;
use crate::core_vault::store::record_store::RecordStore;

/// Complete in-memory state of one vault
#[derive(Debug, Clone, Default)]
pub struct VaultState {
    pub records: RecordStore,
    pub access: AccessLedger,
    pub index: SearchIndex,
}

impl VaultState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.access.is_empty()
    }
}

/// Storage statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultStats {
    pub records: usize,
    pub grants: usize,
    pub tokens: usize,
}

impl From<&VaultState> for VaultStats {
    fn from(state: &VaultState) -> Self {
        VaultStats {
            records: state.records.len(),
            grants: state.access.grant_count(),
            tokens: state.index.stats().total_tokens,
        }
    }
}
