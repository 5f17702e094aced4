/*
    errors.rs - Error types for the vault subsystem

    Defines all error types that can occur in:
    - Key management and encryption
    - Persistence of vault state
    - Input validation
    - Synchronization
*/

use thiserror::Error;

/// Errors that can occur in the vault subsystem
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record or grant not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage I/O error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Input rejected before any mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Encryption failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Ciphertext truncated, tampered, or sealed under another key
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Persisted vault state exists but cannot be read back
    #[error("Corrupt vault state: {0}")]
    CorruptState(String),

    /// Key file present but unusable
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for vault operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Validation-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Grant called without recipients
    #[error("Recipient list is empty")]
    EmptyRecipients,

    /// Recipient identifier is empty or whitespace
    #[error("Recipient identifier is blank")]
    BlankRecipient,

    /// Negative expiry in days
    #[error("Expiry must not be negative, got {0} days")]
    NegativeExpiry(i64),

    /// Invalid field value
    #[error("Invalid field value: {field} - {reason}")]
    InvalidField { field: String, reason: String },
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Validation(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl StoreError {
    /// True for the "state unreadable" family: callers must not treat these
    /// as an empty vault.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, StoreError::Decryption(_) | StoreError::CorruptState(_))
    }
}
