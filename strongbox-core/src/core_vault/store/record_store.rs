/*
    record_store.rs - Content-addressed encrypted records

    Maps content-derived ids to encrypted payloads plus metadata and
    timestamps. Identical content always maps to the same id, so storing it
    again is an upsert rather than a duplicate.

    Timestamp rules per id:
    - created_at is set once and preserved by later upserts
    - updated_at strictly increases on every upsert, even when two upserts
      land in the same millisecond
*/

use crate::core_vault::model::{Document, Metadata, RecordId, RecordSummary, StoredRecord, Timestamp};
use crate::core_vault::store::encryption::Cipher;
use crate::core_vault::store::errors::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Encrypt a document for storage, returning its id and sealed payload
pub fn seal(cipher: &Cipher, content: &Document) -> StoreResult<(RecordId, Vec<u8>)> {
    content.validate()?;
    let plaintext = content.canonical_bytes()?;
    let id = content.content_id()?;
    let payload = cipher.encrypt(&plaintext)?;
    Ok((id, payload))
}

/// Decrypt and parse a stored record's content
pub fn unseal(cipher: &Cipher, record: &StoredRecord) -> StoreResult<Document> {
    let plaintext = cipher.decrypt(&record.encrypted_payload)?;
    Document::from_json_bytes(&plaintext).map_err(|e| {
        StoreError::Decryption(format!("record {} payload unreadable: {}", record.id.short(), e))
    })
}

/// In-memory record table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordStore {
    records: BTreeMap<RecordId, StoredRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a record.
    ///
    /// `metadata: None` keeps an existing record's metadata and gives a new
    /// record an empty map.
    pub fn upsert(
        &mut self,
        id: RecordId,
        encrypted_payload: Vec<u8>,
        metadata: Option<Metadata>,
        now: Timestamp,
    ) -> Upsert {
        match self.records.get_mut(&id) {
            Some(existing) => {
                existing.encrypted_payload = encrypted_payload;
                if let Some(metadata) = metadata {
                    existing.metadata = metadata;
                }
                existing.updated_at = now.max(existing.updated_at.plus_millis(1));
                Upsert::Updated
            }
            None => {
                let record = StoredRecord {
                    id: id.clone(),
                    encrypted_payload,
                    metadata: metadata.unwrap_or_default(),
                    created_at: now,
                    updated_at: now,
                };
                self.records.insert(id, record);
                Upsert::Inserted
            }
        }
    }

    /// Replace a record wholesale, keeping its timestamps as given
    pub fn put(&mut self, record: StoredRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &RecordId) -> Option<&StoredRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in id order
    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &StoredRecord)> {
        self.records.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.records.keys()
    }

    pub fn summaries(&self) -> Vec<RecordSummary> {
        self.records.values().map(RecordSummary::from).collect()
    }
}
