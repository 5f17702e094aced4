/*
    Data models for core_vault
*/

pub mod clock;
pub mod document;
pub mod record;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use document::{Document, FieldValue};
pub use record::{AccessGrant, Metadata, RecordSummary, StoredRecord};
pub use types::{RecipientId, RecordId, Timestamp, MILLIS_PER_DAY};
