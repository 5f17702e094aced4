/*
    record.rs - Persisted record and grant entries
*/

use crate::core_vault::model::types::{RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form metadata attached at store time. Stored in clear inside the
/// (encrypted) vault blob, never indexed.
pub type Metadata = BTreeMap<String, String>;

/// A record as held in the vault: ciphertext plus bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,

    /// nonce || AEAD ciphertext of the canonical JSON content
    pub encrypted_payload: Vec<u8>,

    pub metadata: Metadata,

    pub created_at: Timestamp,

    /// Drives last-write-wins during merge
    pub updated_at: Timestamp,
}

/// Listing view of a record without its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub metadata: Metadata,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&StoredRecord> for RecordSummary {
    fn from(record: &StoredRecord) -> Self {
        RecordSummary {
            id: record.id.clone(),
            metadata: record.metadata.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Access authorization for one (record, recipient) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub granted_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl AccessGrant {
    pub fn new(granted_at: Timestamp, expires_at: Option<Timestamp>) -> Self {
        AccessGrant { granted_at, expires_at }
    }

    /// A grant is expired once its expiry is at or before `now`.
    /// Grants without an expiry never expire.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        matches!(self.expires_at, Some(expiry) if expiry <= now)
    }
}
