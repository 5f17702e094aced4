//! Credential store error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Invalid username '{0}': use 1-64 of A-Z a-z 0-9 _ . -")]
    InvalidUsername(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Credential storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self {
        AuthError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Storage(err.to_string())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
