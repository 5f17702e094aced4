/*
    vault.rs - High-level vault interface

    Composes record store, search index, access ledger and persistence for a
    single vault location. Every mutating call ends with a full synchronous
    save of the vault state before it returns.

    Concurrency:
    - a Vault is single-writer; share it through SharedVault
    - SharedVault wraps it in one std Mutex; a poisoned lock surfaces as
      StoreError::Internal
*/

use crate::core_vault::access::validate_grant_request;
use crate::core_vault::model::{
    AccessGrant, Clock, Document, Metadata, RecipientId, RecordId, RecordSummary, SystemClock,
};
use crate::core_vault::store::codec::{rebuild_index, LoadOutcome, PersistenceCodec};
use crate::core_vault::store::encryption::Cipher;
use crate::core_vault::store::errors::{StoreError, StoreResult};
use crate::core_vault::store::keys::{KeyManager, VaultLocation};
use crate::core_vault::store::record_store::{seal, unseal, Upsert};
use crate::core_vault::store::state::{VaultState, VaultStats};
use crate::core_vault::sync::{MergeReport, RemoteRecord, RemoteSource, RemoteState, SyncEngine};
use crate::metrics::{record_counter, GRANTS_ISSUED, GRANTS_SWEPT, RECORDS_STORED, SEARCH_DROPPED, SYNC_CYCLES};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// Helper to convert poison errors into StoreError
fn handle_poison<T>(_err: PoisonError<T>) -> StoreError {
    StoreError::Internal("Lock poisoned: a thread panicked while holding the vault".to_string())
}

/// What to do when the state file exists but cannot be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptStatePolicy {
    /// Refuse to open; leave the file untouched
    #[default]
    Abort,
    /// Rename the file aside and start with an empty vault
    Quarantine,
}

/// Options for opening a vault
#[derive(Clone)]
pub struct VaultOptions {
    pub corrupt_policy: CorruptStatePolicy,
    pub clock: Arc<dyn Clock>,
}

impl Default for VaultOptions {
    fn default() -> Self {
        VaultOptions {
            corrupt_policy: CorruptStatePolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

/// One recipient's grant as reported by `Vault::grants_for`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantStatus {
    pub recipient: RecipientId,
    pub grant: AccessGrant,
    pub expired: bool,
}

/// Encrypted record vault bound to one storage location
pub struct Vault {
    location: VaultLocation,
    cipher: Cipher,
    codec: PersistenceCodec,
    state: VaultState,
    clock: Arc<dyn Clock>,
}

impl Vault {
    /// Open with the system clock and the abort-on-corruption policy
    pub fn open(location: VaultLocation) -> StoreResult<Self> {
        Self::open_with(location, VaultOptions::default())
    }

    /// Load or create the key for `location`, then load its state
    pub fn open_with(location: VaultLocation, options: VaultOptions) -> StoreResult<Self> {
        location.ensure_parent()?;
        let key = KeyManager::load_or_create(&location)?;
        let cipher = Cipher::new(&key);
        let codec = PersistenceCodec::new(&location, cipher.clone());

        let state = match codec.load() {
            Ok(LoadOutcome::Fresh(state)) => {
                info!(vault = %location.name(), "Starting empty vault");
                state
            }
            Ok(LoadOutcome::Existing(state)) => state,
            Err(StoreError::CorruptState(reason)) => match options.corrupt_policy {
                CorruptStatePolicy::Abort => {
                    error!(vault = %location.name(), %reason, "Vault state is corrupt, refusing to open");
                    return Err(StoreError::CorruptState(reason));
                }
                CorruptStatePolicy::Quarantine => {
                    let moved = codec.quarantine(options.clock.now())?;
                    error!(
                        vault = %location.name(),
                        %reason,
                        quarantined = %moved.display(),
                        "Vault state is corrupt, moved aside and starting empty"
                    );
                    VaultState::new()
                }
            },
            Err(e) => return Err(e),
        };

        info!(
            vault = %location.name(),
            records = state.records.len(),
            grants = state.access.grant_count(),
            "Vault opened"
        );

        Ok(Vault {
            location,
            cipher,
            codec,
            state,
            clock: options.clock,
        })
    }

    pub fn location(&self) -> &VaultLocation {
        &self.location
    }

    pub fn name(&self) -> String {
        self.location.name()
    }

    /// Read-only view of the in-memory state
    pub fn state(&self) -> &VaultState {
        &self.state
    }

    /// Store content, returning its content-derived id
    pub fn store(&mut self, content: &Document, metadata: Option<Metadata>) -> StoreResult<RecordId> {
        let id = self.store_in_memory(content, metadata)?;
        self.save()?;
        Ok(id)
    }

    /// Store content and grant access to `recipients`, persisting once
    pub fn store_and_share(
        &mut self,
        content: &Document,
        metadata: Option<Metadata>,
        recipients: &[RecipientId],
        expiry_days: Option<i64>,
    ) -> StoreResult<RecordId> {
        let days = validate_grant_request(recipients, expiry_days)?;
        let id = self.store_in_memory(content, metadata)?;
        self.grant_in_memory(&id, recipients, days);
        self.save()?;
        Ok(id)
    }

    fn store_in_memory(&mut self, content: &Document, metadata: Option<Metadata>) -> StoreResult<RecordId> {
        let (id, payload) = seal(&self.cipher, content)?;
        let now = self.clock.now();

        let outcome = self.state.records.upsert(id.clone(), payload, metadata, now);
        self.state.index.index(&id, content);
        record_counter(RECORDS_STORED, 1);

        debug!(
            vault = %self.location.name(),
            record = %id.short(),
            updated = outcome == Upsert::Updated,
            "Record stored"
        );
        Ok(id)
    }

    /// Decrypted content, or `None` for an unknown id or unreadable payload
    pub fn retrieve(&self, id: &RecordId) -> StoreResult<Option<Document>> {
        match self.try_retrieve(id) {
            Ok(content) => Ok(Some(content)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(StoreError::Decryption(reason)) => {
                warn!(record = %id.short(), %reason, "Record payload failed to decrypt");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Decrypted content, distinguishing unknown ids from corrupt payloads
    pub fn try_retrieve(&self, id: &RecordId) -> StoreResult<Document> {
        let record = self
            .state
            .records
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("record {}", id)))?;
        unseal(&self.cipher, record)
    }

    /// Records matching any query token, in id order. Hits whose payload
    /// fails to decrypt are dropped.
    pub fn search(&self, query: &str) -> StoreResult<Vec<(RecordId, Document)>> {
        let ids = self.state.index.search(query);
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            match self.try_retrieve(&id) {
                Ok(content) => results.push((id, content)),
                Err(e @ (StoreError::Decryption(_) | StoreError::NotFound(_))) => {
                    warn!(record = %id.short(), error = %e, "Dropping unreadable search hit");
                    record_counter(SEARCH_DROPPED, 1);
                }
                Err(e) => return Err(e),
            }
        }

        debug!(query, hits = results.len(), "Search complete");
        Ok(results)
    }

    /// Grant `recipients` access to a record. Zero days means no expiry.
    pub fn grant(
        &mut self,
        id: &RecordId,
        recipients: &[RecipientId],
        expiry_days: Option<i64>,
    ) -> StoreResult<usize> {
        let days = validate_grant_request(recipients, expiry_days)?;
        if !self.state.records.contains(id) {
            return Err(StoreError::NotFound(format!("record {}", id)));
        }

        let written = self.grant_in_memory(id, recipients, days);
        self.save()?;
        Ok(written)
    }

    fn grant_in_memory(&mut self, id: &RecordId, recipients: &[RecipientId], days: Option<u64>) -> usize {
        let now = self.clock.now();
        let expires_at = days.map(|d| now.plus_days(d));
        let written = self.state.access.grant(id, recipients, now, expires_at);
        record_counter(GRANTS_ISSUED, written as u64);

        debug!(
            record = %id.short(),
            recipients = written,
            expires_at = ?expires_at.map(|t| t.as_millis()),
            "Access granted"
        );
        written
    }

    /// Remove a grant. Returns whether one existed.
    pub fn revoke(&mut self, id: &RecordId, recipient: &RecipientId) -> StoreResult<bool> {
        let removed = self.state.access.revoke(id, recipient);
        self.save()?;
        debug!(record = %id.short(), %recipient, removed, "Access revoked");
        Ok(removed)
    }

    /// Whether `recipient` holds an unexpired grant for the record
    pub fn has_access(&self, id: &RecordId, recipient: &RecipientId) -> bool {
        self.state.access.has_access(id, recipient, self.clock.now())
    }

    /// All grants for a record, expired ones included and flagged
    pub fn grants_for(&self, id: &RecordId) -> Vec<GrantStatus> {
        let now = self.clock.now();
        self.state
            .access
            .grants_for(id)
            .map(|grants| {
                grants
                    .iter()
                    .map(|(recipient, grant)| GrantStatus {
                        recipient: recipient.clone(),
                        grant: *grant,
                        expired: grant.is_expired_at(now),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Purge expired grants. Returns how many were removed.
    pub fn sweep_expired(&mut self) -> StoreResult<usize> {
        let removed = self.state.access.sweep_expired(self.clock.now());
        self.save()?;
        record_counter(GRANTS_SWEPT, removed as u64);
        info!(vault = %self.location.name(), removed, "Swept expired grants");
        Ok(removed)
    }

    pub fn list(&self) -> Vec<RecordSummary> {
        self.state.records.summaries()
    }

    pub fn stats(&self) -> VaultStats {
        VaultStats::from(&self.state)
    }

    /// Rebuild the search index from the records and persist it.
    /// Returns how many records could not be decrypted.
    pub fn rebuild_index(&mut self) -> StoreResult<usize> {
        let (index, skipped) = rebuild_index(&self.cipher, &self.state.records);
        self.state.index = index;
        self.save()?;
        info!(vault = %self.location.name(), skipped, "Search index rebuilt");
        Ok(skipped)
    }

    /// Fetch `remote` and merge it into this vault.
    ///
    /// Do not pass the SharedVault that holds this vault; use
    /// `SharedVault::sync_from`, which never holds both locks.
    pub fn sync_from(&mut self, remote: &dyn RemoteSource) -> StoreResult<MergeReport> {
        let remote_state = remote.fetch_state()?;
        self.merge_remote(&remote_state)
    }

    /// Merge an already-fetched remote state and persist the result
    pub fn merge_remote(&mut self, remote: &RemoteState) -> StoreResult<MergeReport> {
        let report = SyncEngine::merge(&mut self.state, &self.cipher, remote);
        self.save()?;
        record_counter(SYNC_CYCLES, 1);

        info!(
            vault = %self.location.name(),
            remote = %remote.source,
            adopted = report.adopted,
            kept_local = report.kept_local,
            grants = report.grants_merged,
            skipped = report.skipped,
            "Merged remote vault"
        );
        Ok(report)
    }

    /// Plaintext export of this vault for a peer to merge
    pub fn export(&self) -> RemoteState {
        let mut records = Vec::with_capacity(self.state.records.len());
        let mut undecryptable = 0;

        for (id, record) in self.state.records.iter() {
            match unseal(&self.cipher, record) {
                Ok(content) => records.push(RemoteRecord {
                    id: id.clone(),
                    content,
                    metadata: record.metadata.clone(),
                    created_at: record.created_at,
                    updated_at: record.updated_at,
                }),
                Err(e) => {
                    warn!(record = %id.short(), error = %e, "Leaving undecryptable record out of export");
                    undecryptable += 1;
                }
            }
        }

        RemoteState {
            source: self.location.name(),
            records,
            access: self.state.access.clone(),
            undecryptable,
        }
    }

    /// Persist the whole state
    pub fn save(&self) -> StoreResult<()> {
        self.codec.save(&self.state)
    }
}

/// A vault shared between tasks, guarded by one mutex
#[derive(Clone)]
pub struct SharedVault {
    name: String,
    inner: Arc<Mutex<Vault>>,
}

impl SharedVault {
    pub fn new(vault: Vault) -> Self {
        SharedVault {
            name: vault.name(),
            inner: Arc::new(Mutex::new(vault)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lock the vault for a sequence of operations
    pub fn lock(&self) -> StoreResult<MutexGuard<'_, Vault>> {
        self.inner.lock().map_err(handle_poison)
    }

    /// Whether both handles point at the same vault
    pub fn ptr_eq(&self, other: &SharedVault) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Snapshot `remote` first, then lock this vault and merge. The two
    /// locks are never held together.
    pub fn sync_from(&self, remote: &dyn RemoteSource) -> StoreResult<MergeReport> {
        let remote_state = remote.fetch_state()?;
        self.lock()?.merge_remote(&remote_state)
    }
}
