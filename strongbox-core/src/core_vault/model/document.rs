/*
    document.rs - Schema-less record content

    A Document is an ordered map of field name -> FieldValue. Values are a
    closed set of variants so indexing can match on text fields directly
    instead of inspecting arbitrary JSON.

    Canonical form:
    - serde_json over the BTreeMap (keys sorted, no whitespace)
    - the record identifier is the hex SHA-256 of those bytes
*/

use crate::core_vault::model::types::RecordId;
use crate::core_vault::store::errors::{StoreError, StoreResult, ValidationError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A single field value inside a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Borrow the text if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn check_finite(&self, path: &str) -> Result<(), ValidationError> {
        match self {
            FieldValue::Float(f) if !f.is_finite() => Err(ValidationError::InvalidField {
                field: path.to_string(),
                reason: "non-finite float".to_string(),
            }),
            FieldValue::List(items) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, v)| v.check_finite(&format!("{}[{}]", path, i))),
            FieldValue::Map(map) => map
                .iter()
                .try_for_each(|(k, v)| v.check_finite(&format!("{}.{}", path, k))),
            _ => Ok(()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Float(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Plaintext content of a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Top-level text fields, in key order
    pub fn text_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(k, v)| v.as_text().map(|text| (k.as_str(), text)))
    }

    /// Reject values that have no stable JSON encoding
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.fields.iter().try_for_each(|(k, v)| v.check_finite(k))
    }

    /// Canonical JSON encoding used for both hashing and encryption
    pub fn canonical_bytes(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Content-derived identifier
    pub fn content_id(&self) -> StoreResult<RecordId> {
        let bytes = self.canonical_bytes()?;
        Ok(RecordId(hex::encode(Sha256::digest(&bytes))))
    }

    pub fn from_json_bytes(bytes: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Deserialization(e.to_string()))
    }
}

impl From<BTreeMap<String, FieldValue>> for Document {
    fn from(fields: BTreeMap<String, FieldValue>) -> Self {
        Document { fields }
    }
}
