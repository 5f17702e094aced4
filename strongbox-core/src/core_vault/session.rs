/*
    session.rs - Named vaults plus the background sync task

    A Session is what a front-end holds while running: it opens vaults by
    name under one data directory, owns the shutdown coordinator, and at
    most one auto-sync task. Closing the session stops the task and waits
    for it.
*/

use crate::core_vault::model::Clock;
use crate::core_vault::store::errors::{StoreError, StoreResult};
use crate::core_vault::store::{CorruptStatePolicy, SharedVault, Vault, VaultLocation, VaultOptions};
use crate::core_vault::sync::{spawn_auto_sync, AutoSyncSummary};
use crate::shutdown::ShutdownCoordinator;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct Session {
    data_dir: PathBuf,
    options: VaultOptions,
    vaults: BTreeMap<String, SharedVault>,
    shutdown: Arc<ShutdownCoordinator>,
    auto_sync: Option<JoinHandle<AutoSyncSummary>>,
}

impl Session {
    pub fn new(data_dir: impl Into<PathBuf>, options: VaultOptions) -> Self {
        Session {
            data_dir: data_dir.into(),
            options,
            vaults: BTreeMap::new(),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            auto_sync: None,
        }
    }

    pub fn with_policy(data_dir: impl Into<PathBuf>, policy: CorruptStatePolicy) -> Self {
        Self::new(
            data_dir,
            VaultOptions {
                corrupt_policy: policy,
                ..VaultOptions::default()
            },
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.options.clock)
    }

    /// Open `name` under the data directory, or return the handle already
    /// opened by this session
    pub fn vault(&mut self, name: &str) -> StoreResult<SharedVault> {
        if let Some(vault) = self.vaults.get(name) {
            return Ok(vault.clone());
        }

        let location = VaultLocation::in_dir(&self.data_dir, name);
        let vault = SharedVault::new(Vault::open_with(location, self.options.clone())?);
        self.vaults.insert(name.to_string(), vault.clone());
        debug!(vault = name, "Vault added to session");
        Ok(vault)
    }

    /// Coordinator that stops this session's background work, e.g. for
    /// signal handlers
    pub fn shutdown_coordinator(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.shutdown)
    }

    pub fn open_vaults(&self) -> impl Iterator<Item = &str> {
        self.vaults.keys().map(String::as_str)
    }

    /// Start syncing `local` from `remote` every `interval`
    pub fn start_auto_sync(&mut self, local: &str, remote: &str, interval: Duration) -> StoreResult<()> {
        if self.auto_sync.is_some() {
            return Err(StoreError::Internal("auto-sync already running".to_string()));
        }
        if self.shutdown.is_shutting_down() {
            return Err(StoreError::Internal("session is closed".to_string()));
        }
        if interval.is_zero() {
            return Err(StoreError::Validation("sync interval must be greater than 0".to_string()));
        }

        let local = self.vault(local)?;
        let remote = self.vault(remote)?;
        if local.ptr_eq(&remote) {
            return Err(StoreError::Validation("cannot sync a vault with itself".to_string()));
        }

        let handle = spawn_auto_sync(local, Arc::new(remote), interval, self.shutdown.subscribe());
        self.auto_sync = Some(handle);
        Ok(())
    }

    pub fn is_auto_syncing(&self) -> bool {
        self.auto_sync.is_some()
    }

    /// Signal shutdown and wait for the auto-sync task, if any
    pub async fn close(&mut self) -> Option<AutoSyncSummary> {
        self.shutdown.shutdown();
        let handle = self.auto_sync.take()?;

        match handle.await {
            Ok(summary) => {
                info!(cycles = summary.cycles, "Session closed");
                Some(summary)
            }
            Err(e) => {
                warn!("Auto-sync task ended abnormally: {}", e);
                None
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Unawaited task still sees the signal and exits after its cycle
        if !self.shutdown.is_shutting_down() {
            self.shutdown.shutdown();
        }
    }
}
