//! Configuration for Strongbox
//!
//! Defaults, then an optional TOML file, then `STRONGBOX_<SECTION>_<KEY>`
//! environment overrides. Durations are humantime strings ("30s", "5m").

use crate::core_vault::{CorruptStatePolicy, VaultOptions};
use crate::logging::{LogConfig, LogLevel};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;

pub use error::ConfigError;

const ENV_PREFIX: &str = "STRONGBOX_";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrongboxConfig {
    pub vault: VaultConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Vault storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Directory holding key and state files
    pub data_dir: PathBuf,

    /// Name of the vault the front-end works on
    pub local_name: String,

    /// What to do with an unreadable state file
    pub corrupt_policy: CorruptStatePolicy,
}

/// Peer sync configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Name of the peer vault under the data directory
    pub remote_name: String,

    /// Auto-sync interval
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub json_format: bool,
    pub with_timestamp: bool,
    pub with_target: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            local_name: "local".to_string(),
            corrupt_policy: CorruptStatePolicy::Abort,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_name: "cloud".to_string(),
            interval: Duration::from_secs(30),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json_format: false,
            with_timestamp: true,
            with_target: false,
        }
    }
}

impl VaultConfig {
    /// Directory of the credential store
    pub fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }

    pub fn vault_options(&self) -> VaultOptions {
        VaultOptions {
            corrupt_policy: self.corrupt_policy,
            ..VaultOptions::default()
        }
    }
}

impl LoggingConfig {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig::new(self.level)
            .json_format(self.json_format)
            .with_timestamp(self.with_timestamp)
            .with_target(self.with_target)
    }
}

impl StrongboxConfig {
    /// Defaults plus environment overrides
    ///
    /// Example: STRONGBOX_SYNC_INTERVAL=10s
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// File (if given) or defaults, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `STRONGBOX_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(&format!("{}{}", ENV_PREFIX, key));

        // Vault config
        if let Some(dir) = var("VAULT_DATA_DIR") {
            self.vault.data_dir = PathBuf::from(dir);
        }
        if let Some(name) = var("VAULT_LOCAL_NAME") {
            self.vault.local_name = name;
        }
        if let Some(policy) = var("VAULT_CORRUPT_POLICY") {
            self.vault.corrupt_policy = match policy.to_lowercase().as_str() {
                "abort" => CorruptStatePolicy::Abort,
                "quarantine" => CorruptStatePolicy::Quarantine,
                other => {
                    return Err(ConfigError::InvalidOverride {
                        var: format!("{}VAULT_CORRUPT_POLICY", ENV_PREFIX),
                        reason: format!("unknown policy '{}'", other),
                    })
                }
            };
        }

        // Sync config
        if let Some(name) = var("SYNC_REMOTE_NAME") {
            self.sync.remote_name = name;
        }
        if let Some(interval) = var("SYNC_INTERVAL") {
            self.sync.interval = humantime_serde::re::humantime::parse_duration(&interval)
                .map_err(|e| invalid_override("SYNC_INTERVAL", e))?;
        }

        // Logging config
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level
                .parse()
                .map_err(|e| invalid_override("LOG_LEVEL", e))?;
        }
        if let Some(json) = var("LOG_JSON") {
            self.logging.json_format = json
                .parse()
                .map_err(|e| invalid_override("LOG_JSON", e))?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vault.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "data_dir must not be empty".to_string(),
            ));
        }

        for (field, name) in [
            ("local_name", &self.vault.local_name),
            ("remote_name", &self.sync.remote_name),
        ] {
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a plain, non-empty name",
                    field
                )));
            }
        }

        if self.vault.local_name == self.sync.remote_name {
            return Err(ConfigError::Invalid(
                "local and remote vault names must differ".to_string(),
            ));
        }

        if self.sync.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "sync interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }
}

fn invalid_override(key: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidOverride {
        var: format!("{}{}", ENV_PREFIX, key),
        reason: err.to_string(),
    }
}
