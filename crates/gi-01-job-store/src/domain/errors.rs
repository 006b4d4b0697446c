//! # Error Types

use crate::domain::entities::JobId;
use thiserror::Error;

/// Errors raised by a key-value store adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}

/// Errors raised by the job store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobStoreError {
    /// Underlying key-value store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] KVStoreError),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No job with this id is stored.
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// The job was rejected before it was written.
    #[error("Invalid job: {0}")]
    InvalidJob(String),
}

impl From<bincode::Error> for JobStoreError {
    fn from(err: bincode::Error) -> Self {
        JobStoreError::Serialization(err.to_string())
    }
}
