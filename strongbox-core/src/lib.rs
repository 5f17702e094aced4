pub mod auth;
pub mod config;
pub mod core_vault;
pub mod logging;
pub mod metrics;
pub mod shutdown;

pub use config::StrongboxConfig;
pub use core_vault::{Document, RecordId, SharedVault, StoreError, StoreResult, Vault};
pub use logging::{init_logging, LogLevel};
