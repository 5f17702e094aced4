//! Local credential store
//!
//! Username/password registration and verification for the front-end. The
//! vault itself has no notion of a current user.

mod credentials;
mod error;

pub use credentials::{CredentialStore, UserRecord};
pub use error::{AuthError, AuthResult};
