/*
    ledger.rs - Per-record access grants

    record id -> recipient -> AccessGrant

    Reads treat an expired grant as absent but never remove it; physical
    removal only happens in sweep_expired. Merging another ledger is
    last-applied-wins per (record, recipient): the incoming entry replaces
    the local one without comparing timestamps.
*/

use crate::core_vault::model::{AccessGrant, RecipientId, RecordId, Timestamp};
use crate::core_vault::store::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Grants for a single record
pub type RecordGrants = BTreeMap<RecipientId, AccessGrant>;

/// Check a grant request before anything is mutated.
///
/// Returns the expiry in whole days, with `Some(0)` normalised to `None`
/// (zero days means "no expiry").
pub fn validate_grant_request(
    recipients: &[RecipientId],
    expiry_days: Option<i64>,
) -> Result<Option<u64>, ValidationError> {
    if recipients.is_empty() {
        return Err(ValidationError::EmptyRecipients);
    }
    if recipients.iter().any(|r| r.as_str().trim().is_empty()) {
        return Err(ValidationError::BlankRecipient);
    }
    match expiry_days {
        Some(days) if days < 0 => Err(ValidationError::NegativeExpiry(days)),
        Some(0) | None => Ok(None),
        Some(days) => Ok(Some(days as u64)),
    }
}

/// Access-control ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLedger {
    grants: BTreeMap<RecordId, RecordGrants>,
}

impl AccessLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write or overwrite a grant for each recipient. Returns the number of
    /// grants written.
    pub fn grant(
        &mut self,
        id: &RecordId,
        recipients: &[RecipientId],
        now: Timestamp,
        expires_at: Option<Timestamp>,
    ) -> usize {
        let entry = self.grants.entry(id.clone()).or_default();
        for recipient in recipients {
            entry.insert(recipient.clone(), AccessGrant::new(now, expires_at));
        }
        recipients.len()
    }

    /// Remove a grant. Absent grants are not an error.
    pub fn revoke(&mut self, id: &RecordId, recipient: &RecipientId) -> bool {
        let Some(entry) = self.grants.get_mut(id) else {
            return false;
        };
        let removed = entry.remove(recipient).is_some();
        if entry.is_empty() {
            self.grants.remove(id);
        }
        removed
    }

    /// Whether `recipient` currently has access. Does not mutate.
    pub fn has_access(&self, id: &RecordId, recipient: &RecipientId, now: Timestamp) -> bool {
        self.grant_for(id, recipient)
            .map(|grant| !grant.is_expired_at(now))
            .unwrap_or(false)
    }

    pub fn grant_for(&self, id: &RecordId, recipient: &RecipientId) -> Option<&AccessGrant> {
        self.grants.get(id).and_then(|entry| entry.get(recipient))
    }

    /// All grants (expired or not) for a record
    pub fn grants_for(&self, id: &RecordId) -> Option<&RecordGrants> {
        self.grants.get(id)
    }

    /// Remove every grant whose expiry is at or before `now`.
    /// Returns the number of grants removed.
    pub fn sweep_expired(&mut self, now: Timestamp) -> usize {
        let mut removed = 0;
        self.grants.retain(|_, entry| {
            let before = entry.len();
            entry.retain(|_, grant| !grant.is_expired_at(now));
            removed += before - entry.len();
            !entry.is_empty()
        });
        removed
    }

    /// Union `other` into this ledger; on overlap `other`'s entry wins.
    /// Returns the number of entries written.
    pub fn merge_from(&mut self, other: &AccessLedger) -> usize {
        let mut written = 0;
        for (id, remote_entry) in &other.grants {
            if remote_entry.is_empty() {
                continue;
            }
            let local_entry = self.grants.entry(id.clone()).or_default();
            for (recipient, grant) in remote_entry {
                local_entry.insert(recipient.clone(), *grant);
                written += 1;
            }
        }
        written
    }

    /// Total number of grant entries, including expired ones
    pub fn grant_count(&self) -> usize {
        self.grants.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &RecordGrants)> {
        self.grants.iter()
    }
}
