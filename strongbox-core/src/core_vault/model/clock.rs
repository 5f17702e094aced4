//! Injectable time source
//!
//! Vault operations read "now" through a [`Clock`] so grant expiry can be
//! exercised without sleeping: production uses [`SystemClock`], tests drive a
//! [`ManualClock`] forward explicitly.

use super::types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Abstract time source
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> Timestamp;
}

/// Real system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually advanced clock. Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start.as_millis())),
        }
    }

    /// Move time forward by `millis`
    pub fn advance_millis(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Move time forward by whole days
    pub fn advance_days(&self, days: u64) {
        self.advance_millis(days * super::types::MILLIS_PER_DAY);
    }

    pub fn set(&self, at: Timestamp) {
        self.millis.store(at.as_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(Timestamp::from_millis(100));
        assert_eq!(clock.now().as_millis(), 100);

        clock.advance_millis(50);
        assert_eq!(clock.now().as_millis(), 150);

        let shared = clock.clone();
        shared.advance_days(1);
        assert_eq!(clock.now(), Timestamp::from_millis(150).plus_days(1));
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01 in millis
        assert!(SystemClock.now().as_millis() > 1_577_836_800_000);
    }
}
