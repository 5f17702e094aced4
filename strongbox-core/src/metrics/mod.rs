//! Metrics for vault operations
//!
//! Emitted through the `metrics` facade. No exporter is installed here; a
//! binary that wants them scraped installs its own recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

pub const RECORDS_STORED: &str = "vault.records.stored";
pub const GRANTS_ISSUED: &str = "vault.grants.issued";
pub const GRANTS_SWEPT: &str = "vault.grants.swept";
pub const SYNC_CYCLES: &str = "vault.sync.cycles";
pub const SEARCH_DROPPED: &str = "vault.search.dropped";
pub const SAVE_DURATION_MS: &str = "vault.save.duration_ms";

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!(RECORDS_STORED, "Number of records stored or re-stored");
    describe_counter!(GRANTS_ISSUED, "Number of access grants written");
    describe_counter!(GRANTS_SWEPT, "Number of expired grants removed by sweeps");
    describe_counter!(SYNC_CYCLES, "Number of completed sync merges");
    describe_counter!(
        SEARCH_DROPPED,
        "Search hits dropped because their payload failed to decrypt"
    );
    describe_histogram!(SAVE_DURATION_MS, "Vault state save duration in milliseconds");
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}

/// Record a histogram metric
pub fn record_histogram(name: &'static str, value: f64) {
    histogram!(name).record(value);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let duration = self.start.elapsed();
        record_histogram(self.name, duration.as_secs_f64() * 1000.0);
    }
}
