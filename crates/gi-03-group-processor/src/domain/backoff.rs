//! # Retry Backoff
//!
//! `delay = min(initial * 2^n, max)` where `n` counts retries scheduled since
//! the last committed batch. Every scheduled retry counts, including one a
//! wake signal ends early.

use std::time::Duration;

/// Per-worker backoff state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    retries: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            retries: 0,
        }
    }

    /// Delay for the next wait.
    pub fn current_delay(&self) -> Duration {
        // 2^31 * 1ms already exceeds any sane ceiling.
        let factor = 1u32.checked_shl(self.retries.min(31)).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// Schedule a retry: returns the delay to wait and doubles the next one.
    pub fn schedule_retry(&mut self) -> Duration {
        let delay = self.current_delay();
        self.retries = self.retries.saturating_add(1);
        delay
    }

    /// A batch succeeded.
    pub fn reset(&mut self) {
        self.retries = 0;
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}
