//! # Processor Configuration

use crate::domain::ProcessorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default foreground batch size.
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Default background batch size.
pub const DEFAULT_BACKGROUND_BATCH_SIZE: usize = 1;

/// Tuning for the queue supervisor and its workers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum jobs fetched per batch in the foreground.
    pub batch_size: usize,

    /// Maximum jobs fetched per batch in the background.
    pub background_batch_size: usize,

    /// First backoff wait after a retryable failure.
    pub initial_retry_delay_ms: u64,

    /// Backoff ceiling.
    pub max_retry_delay_ms: u64,

    /// Pause between successful batches so the next one can fill up.
    pub batch_spacing_ms: u64,

    /// Capacity of the wake/notification bus.
    pub bus_capacity: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            background_batch_size: DEFAULT_BACKGROUND_BATCH_SIZE,
            initial_retry_delay_ms: 1_000,
            max_retry_delay_ms: 5 * 60 * 1_000,
            batch_spacing_ms: 500,
            bus_capacity: 256,
        }
    }
}

impl ProcessorConfig {
    /// Create a config for testing (short waits, no spacing).
    pub fn for_testing() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            background_batch_size: DEFAULT_BACKGROUND_BATCH_SIZE,
            initial_retry_delay_ms: 10,
            max_retry_delay_ms: 80,
            batch_spacing_ms: 0,
            bus_capacity: 64,
        }
    }

    /// Reject configurations the worker cannot run with.
    pub fn validate(&self) -> Result<(), ProcessorError> {
        if self.batch_size == 0 || self.background_batch_size == 0 {
            return Err(ProcessorError::InvalidConfig(
                "batch sizes must be at least 1".to_string(),
            ));
        }
        if self.initial_retry_delay_ms == 0 {
            return Err(ProcessorError::InvalidConfig(
                "initial retry delay must be positive".to_string(),
            ));
        }
        if self.max_retry_delay_ms < self.initial_retry_delay_ms {
            return Err(ProcessorError::InvalidConfig(format!(
                "max retry delay {}ms is below initial {}ms",
                self.max_retry_delay_ms, self.initial_retry_delay_ms
            )));
        }
        Ok(())
    }

    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    pub fn batch_spacing(&self) -> Duration {
        Duration::from_millis(self.batch_spacing_ms)
    }
}
