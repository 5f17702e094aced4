//! Background periodic sync
//!
//! Every `interval` the task pulls the remote and merges it into the local
//! vault. The merge and save run on the blocking pool under the vault's
//! mutex. Shutdown is checked between cycles: a cycle that has started is
//! allowed to finish, and no new one starts afterwards.

use crate::core_vault::store::SharedVault;
use crate::core_vault::sync::remote::RemoteSource;
use crate::shutdown::ShutdownSignal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// What the loop did before it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoSyncSummary {
    pub cycles: u64,
    pub failures: u64,
}

/// Spawn the auto-sync loop. The first cycle runs right away, then one per
/// `interval`.
pub fn spawn_auto_sync(
    local: SharedVault,
    remote: Arc<dyn RemoteSource>,
    interval: Duration,
    mut shutdown: ShutdownSignal,
) -> JoinHandle<AutoSyncSummary> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut summary = AutoSyncSummary::default();

        info!(
            local = local.name(),
            remote = remote.name(),
            interval_ms = interval.as_millis() as u64,
            "Auto-sync started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }

            let vault = local.clone();
            let source = Arc::clone(&remote);
            let outcome = tokio::task::spawn_blocking(move || vault.sync_from(source.as_ref())).await;

            match outcome {
                Ok(Ok(report)) => {
                    summary.cycles += 1;
                    debug!(adopted = report.adopted, grants = report.grants_merged, "Auto-sync cycle done");
                }
                Ok(Err(e)) => {
                    summary.failures += 1;
                    warn!(local = local.name(), error = %e, "Auto-sync cycle failed");
                }
                Err(e) => {
                    summary.failures += 1;
                    error!(local = local.name(), "Auto-sync task join error: {}", e);
                }
            }
        }

        info!(
            local = local.name(),
            cycles = summary.cycles,
            failures = summary.failures,
            "Auto-sync stopped"
        );
        summary
    })
}
