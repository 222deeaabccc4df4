//! Utility functions and types

pub mod stats;

pub use stats::{ensure_finite, min_max, percentile, unique_count};

use std::time::{Duration, Instant};

/// Wall-clock timer for debug logging of long-running steps
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log the elapsed time at debug level and return it
    pub fn stop(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::debug!(step = self.label, elapsed_ms = elapsed.as_millis() as u64, "finished");
        elapsed
    }
}
