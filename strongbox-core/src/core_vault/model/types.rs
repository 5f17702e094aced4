/*
    types.rs - Common types for core_vault models

    Defines:
    - Timestamps
    - IDs for records and recipients
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds in one day, used for grant expiry arithmetic
pub const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

const SHORT_ID_CHARS: usize = 12;

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp representing the current time
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Timestamp(millis)
    }

    /// Create a timestamp from milliseconds since epoch
    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Get milliseconds since epoch
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Timestamp `days` whole days after this one
    pub fn plus_days(&self, days: u64) -> Self {
        Timestamp(self.0.saturating_add(days.saturating_mul(MILLIS_PER_DAY)))
    }

    /// Timestamp `millis` milliseconds after this one
    pub fn plus_millis(&self, millis: u64) -> Self {
        Timestamp(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content-derived identifier of a stored record (hex SHA-256)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_ID_CHARS) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

/// Opaque identifier of someone a record is shared with
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipientId(pub String);

impl RecipientId {
    pub fn new(id: impl Into<String>) -> Self {
        RecipientId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecipientId {
    fn from(s: &str) -> Self {
        RecipientId(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ordering() {
        let a = Timestamp::from_millis(10);
        let b = Timestamp::from_millis(20);
        assert!(a < b);
        assert_eq!(a.as_millis(), 10);
    }

    #[test]
    fn test_plus_days() {
        let t = Timestamp::from_millis(1_000);
        assert_eq!(t.plus_days(1).as_millis(), 1_000 + MILLIS_PER_DAY);
        assert_eq!(t.plus_days(0), t);
    }

    #[test]
    fn test_plus_days_saturates() {
        let t = Timestamp::from_millis(u64::MAX - 5);
        assert_eq!(t.plus_days(3).as_millis(), u64::MAX);
    }

    #[test]
    fn test_record_id_short() {
        let id = RecordId::new("0123456789abcdef0123");
        assert_eq!(id.short(), "0123456789ab");
        assert_eq!(RecordId::new("abc").short(), "abc");
    }

    #[test]
    fn test_record_id_short_multibyte() {
        // 'é' spans bytes 11..13
        let id = RecordId::new("aaaaaaaaaaaé-forged");
        assert_eq!(id.short(), "aaaaaaaaaaaé");
        assert_eq!(RecordId::new("ééé").short(), "ééé");
    }
}
