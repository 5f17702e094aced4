/*
    merge.rs - Last-write-wins reconciliation of two vault copies

    Records: a remote record replaces the local one if the local copy is
    missing or strictly older by updated_at. Equal timestamps keep the local
    entry. The winner is adopted under the remote id with the remote
    content, timestamps and metadata, re-encrypted under the local key and
    re-indexed from its plaintext.

    Grants: every remote (record, recipient) entry is written into the local
    ledger, overwriting whatever was there. This makes grant merge
    directional: merge(A, B) and merge(B, A) can disagree on overlaps.

    The remote is only read.
*/

use crate::core_vault::model::StoredRecord;
use crate::core_vault::store::encryption::Cipher;
use crate::core_vault::store::record_store::seal;
use crate::core_vault::store::state::VaultState;
use crate::core_vault::sync::remote::{RemoteRecord, RemoteState};
use tracing::{debug, warn};

/// Counts from one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Remote records written locally
    pub adopted: usize,
    /// Records present on both sides where the local copy was kept
    pub kept_local: usize,
    /// Grant entries written from the remote ledger
    pub grants_merged: usize,
    /// Remote records that could not be adopted
    pub skipped: usize,
}

impl MergeReport {
    pub fn changed(&self) -> bool {
        self.adopted > 0 || self.grants_merged > 0
    }
}

pub struct SyncEngine;

impl SyncEngine {
    /// Merge `remote` into `local`, sealing adopted records with `cipher`
    pub fn merge(local: &mut VaultState, cipher: &Cipher, remote: &RemoteState) -> MergeReport {
        let mut report = MergeReport {
            skipped: remote.undecryptable,
            ..MergeReport::default()
        };

        let mut ordered: Vec<&RemoteRecord> = remote.records.iter().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));

        for incoming in ordered {
            let remote_wins = match local.records.get(&incoming.id) {
                None => true,
                Some(existing) => incoming.updated_at > existing.updated_at,
            };
            if !remote_wins {
                if local.records.contains(&incoming.id) {
                    report.kept_local += 1;
                }
                continue;
            }

            let (computed, payload) = match seal(cipher, &incoming.content) {
                Ok(sealed) => sealed,
                Err(e) => {
                    warn!(record = %incoming.id.short(), error = %e, "Cannot re-seal remote record");
                    report.skipped += 1;
                    continue;
                }
            };
            // Edited records keep their original id
            if computed != incoming.id {
                warn!(
                    record = %incoming.id.short(),
                    computed = %computed.short(),
                    "Remote record id does not match its content"
                );
            }

            local.index.index(&incoming.id, &incoming.content);
            local.records.put(StoredRecord {
                id: incoming.id.clone(),
                encrypted_payload: payload,
                metadata: incoming.metadata.clone(),
                created_at: incoming.created_at,
                updated_at: incoming.updated_at,
            });
            report.adopted += 1;
        }

        report.grants_merged = local.access.merge_from(&remote.access);

        debug!(
            source = %remote.source,
            adopted = report.adopted,
            kept_local = report.kept_local,
            grants = report.grants_merged,
            "Merge complete"
        );
        report
    }
}
