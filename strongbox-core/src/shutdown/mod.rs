//! Shutdown coordination for background vault tasks
//!
//! A session owns one coordinator; each background task holds a
//! `ShutdownSignal`. The signal is level-triggered: a task that subscribes
//! after shutdown was requested still observes it.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Shutdown state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ShuttingDown,
}

/// Owner side of the cancellation signal
#[derive(Debug)]
pub struct ShutdownCoordinator {
    state_tx: watch::Sender<ShutdownState>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(ShutdownState::Running);
        Self { state_tx }
    }

    /// Subscribe to shutdown notifications
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            state_rx: self.state_tx.subscribe(),
        }
    }

    /// Request shutdown. Calling it again is a no-op.
    pub fn shutdown(&self) {
        let changed = self.state_tx.send_if_modified(|state| {
            if *state == ShutdownState::Running {
                *state = ShutdownState::ShuttingDown;
                true
            } else {
                false
            }
        });

        if changed {
            info!("Shutdown requested");
        } else {
            warn!("Shutdown already in progress");
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.state_tx.borrow()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state() == ShutdownState::ShuttingDown
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Task side of the cancellation signal
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    state_rx: watch::Receiver<ShutdownState>,
}

impl ShutdownSignal {
    pub fn is_shutting_down(&self) -> bool {
        *self.state_rx.borrow() == ShutdownState::ShuttingDown
    }

    /// Resolve once shutdown has been requested. A dropped coordinator
    /// counts as shutdown.
    pub async fn recv(&mut self) {
        loop {
            if self.is_shutting_down() {
                return;
            }
            if self.state_rx.changed().await.is_err() {
                debug!("Shutdown coordinator dropped");
                return;
            }
        }
    }
}

/// Request shutdown on SIGINT or SIGTERM
#[cfg(unix)]
pub fn install_signal_handlers(coordinator: Arc<ShutdownCoordinator>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handlers: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
        coordinator.shutdown();
    });
}

/// Request shutdown on Ctrl+C
#[cfg(not(unix))]
pub fn install_signal_handlers(coordinator: Arc<ShutdownCoordinator>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            return;
        }
        info!("Received Ctrl+C");
        coordinator.shutdown();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_coordinator() {
        let coordinator = ShutdownCoordinator::new();
        assert_eq!(coordinator.state(), ShutdownState::Running);

        coordinator.shutdown();
        assert!(coordinator.is_shutting_down());

        // Second request is harmless
        coordinator.shutdown();
        assert_eq!(coordinator.state(), ShutdownState::ShuttingDown);
    }

    #[tokio::test]
    async fn test_signal_wakes_waiting_task() {
        let coordinator = ShutdownCoordinator::new();
        let mut signal = coordinator.subscribe();

        let task = tokio::spawn(async move {
            signal.recv().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        coordinator.shutdown();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("task did not observe shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.shutdown();

        let mut signal = coordinator.subscribe();
        assert!(signal.is_shutting_down());
        tokio::time::timeout(Duration::from_millis(100), signal.recv())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_coordinator_releases_waiters() {
        let coordinator = ShutdownCoordinator::new();
        let mut signal = coordinator.subscribe();
        drop(coordinator);

        tokio::time::timeout(Duration::from_millis(100), signal.recv())
            .await
            .unwrap();
    }
}
