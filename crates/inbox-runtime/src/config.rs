//! # Runtime Configuration
//!
//! Defaults come from [`ProcessorConfig::default`]; every value can be
//! overridden from the environment.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `GI_BATCH_SIZE` | `processor.batch_size` | 16 |
//! | `GI_BACKGROUND_BATCH_SIZE` | `processor.background_batch_size` | 1 |
//! | `GI_INITIAL_RETRY_MS` | `processor.initial_retry_delay_ms` | 1000 |
//! | `GI_MAX_RETRY_MS` | `processor.max_retry_delay_ms` | 300000 |
//! | `GI_BATCH_SPACING_MS` | `processor.batch_spacing_ms` | 500 |
//! | `GI_DATA_DIR` | `data_dir` | unset (in-memory store) |
//! | `GI_LOG_LEVEL` | `log_level` | `info` |
//! | `GI_LOCAL_SERVICE_ID` | `local_service_id` | random |
//! | `GI_FLUSH_TIMEOUT_MS` | `flush_timeout_ms` | 30000 |

use gi_03_group_processor::{ProcessorConfig, ProcessorError};
use shared_types::ServiceId;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable could not be parsed.
    #[error("{var}={value:?} is not a valid {expected}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// What was expected.
        expected: &'static str,
    },

    /// The processor rejected the resulting configuration.
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct InboxConfig {
    /// Queue and worker tuning.
    pub processor: ProcessorConfig,
    /// Job store directory. `None` keeps jobs in memory.
    pub data_dir: Option<PathBuf>,
    /// Default `tracing` filter directive.
    pub log_level: String,
    /// Identity of the local account.
    pub local_service_id: ServiceId,
    /// How long shutdown waits for the queue to flush.
    pub flush_timeout_ms: u64,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            processor: ProcessorConfig::default(),
            data_dir: None,
            log_level: "info".to_string(),
            local_service_id: ServiceId::random(),
            flush_timeout_ms: 30_000,
        }
    }
}

impl InboxConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let processor = &mut config.processor;

        if let Some(v) = parse(&lookup, "GI_BATCH_SIZE", "batch size")? {
            processor.batch_size = v;
        }
        if let Some(v) = parse(&lookup, "GI_BACKGROUND_BATCH_SIZE", "batch size")? {
            processor.background_batch_size = v;
        }
        if let Some(v) = parse(&lookup, "GI_INITIAL_RETRY_MS", "duration in ms")? {
            processor.initial_retry_delay_ms = v;
        }
        if let Some(v) = parse(&lookup, "GI_MAX_RETRY_MS", "duration in ms")? {
            processor.max_retry_delay_ms = v;
        }
        if let Some(v) = parse(&lookup, "GI_BATCH_SPACING_MS", "duration in ms")? {
            processor.batch_spacing_ms = v;
        }
        if let Some(v) = parse(&lookup, "GI_FLUSH_TIMEOUT_MS", "duration in ms")? {
            config.flush_timeout_ms = v;
        }
        if let Some(id) = parse::<Uuid, _>(&lookup, "GI_LOCAL_SERVICE_ID", "uuid")? {
            config.local_service_id = ServiceId(id);
        }
        if let Some(dir) = lookup("GI_DATA_DIR").filter(|d| !d.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup("GI_LOG_LEVEL").filter(|l| !l.is_empty()) {
            config.log_level = level;
        }

        config.processor.validate()?;
        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, var: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var,
                value,
                expected,
            }),
    }
}
