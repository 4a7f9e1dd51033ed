//! Progress tracking for rescans.
//!
//! This module provides the `RescanProgressTracker`, which records the heights reported by a
//! rescan, counts progress batches and logs progress at regular intervals.

use tracing::info;

/// Heights between two periodic progress log lines.
const LOG_INTERVAL: i32 = 1000;

/// Tracks how far a rescan has progressed.
#[derive(Debug, Clone)]
pub struct RescanProgressTracker {
    /// Height the rescan started from
    start_height: i32,
    /// Highest height the rescan has scanned through
    scanned_through: i32,
    /// Whether any progress was reported
    has_progress: bool,
    /// Number of progress reports received
    batches: usize,
    /// Last height at which we logged progress
    last_logged_height: i32,
}

impl RescanProgressTracker {
    pub fn new(start_height: i32) -> Self {
        Self {
            start_height,
            scanned_through: start_height,
            has_progress: false,
            batches: 0,
            last_logged_height: start_height,
        }
    }

    /// Record a progress report. Heights never move backwards.
    pub fn record(&mut self, scanned_through: i32) {
        self.scanned_through = self.scanned_through.max(scanned_through);
        self.has_progress = true;
        self.batches += 1;
    }

    /// Highest height scanned so far.
    pub fn scanned_through(&self) -> i32 {
        self.scanned_through
    }

    pub fn has_progress(&self) -> bool {
        self.has_progress
    }

    /// Log progress every [`LOG_INTERVAL`] heights or when forced.
    pub fn log_progress(&mut self, force: bool) {
        let since_last_log = self
            .scanned_through
            .saturating_sub(self.last_logged_height);
        let should_log = force || since_last_log >= LOG_INTERVAL;

        if should_log && self.has_progress {
            info!(
                "Rescan progress: scanned through height {} ({} reports since height {})",
                self.scanned_through, self.batches, self.start_height
            );
            self.last_logged_height = self.scanned_through;
        }
    }

    pub fn get_stats(&self) -> RescanStats {
        RescanStats {
            start_height: self.start_height,
            scanned_through: self.scanned_through,
            batches: self.batches,
        }
    }
}

/// Summary of a rescan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescanStats {
    pub start_height: i32,
    pub scanned_through: i32,
    pub batches: usize,
}

impl RescanStats {
    pub fn summary(&self) -> String {
        format!(
            "Rescan from {} to {}: {} progress reports",
            self.start_height, self.scanned_through, self.batches
        )
    }
}
