//! # Domain Errors
//!
//! Every oracle failure falls into one [`FailureClass`]; the worker only
//! ever branches on the class.

use gi_01_job_store::JobStoreError;
use shared_types::Revision;
use thiserror::Error;

/// How the worker reacts to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Keep the job, back off, try again.
    Retryable,
    /// The local user cannot see this group state; drop the job.
    PermanentDiscard,
    /// The embedded change is unusable; fall through to a refresh.
    Malformed,
}

/// Errors reported by the group state oracle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Service answered with an HTTP error status.
    #[error("HTTP error {status}")]
    Http {
        /// Status code.
        status: u16,
    },

    /// Service asked the client to try again later.
    #[error("Service asked to try again")]
    TryAgain,

    /// The local user is not a member of the group.
    #[error("Local user is not a group member")]
    NotAMember,

    /// The local user's invite was revoked.
    #[error("Group invite revoked")]
    InviteRevoked,

    /// The service refused to serve the group state.
    #[error("Request denied")]
    RequestDenied,

    /// The embedded change could not be parsed or applied.
    #[error("Invalid delta: {0}")]
    InvalidDelta(String),

    /// The embedded change's signature did not verify.
    #[error("Delta signature mismatch")]
    SignatureMismatch,

    /// The change does not follow the local revision.
    #[error("Revision mismatch: expected {expected}, got {actual}")]
    RevisionMismatch {
        /// Revision the change needed to follow.
        expected: Revision,
        /// Revision the change actually produces.
        actual: Revision,
    },

    /// Anything else.
    #[error("Oracle error: {0}")]
    Other(String),
}

impl OracleError {
    /// Classify for the worker.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Network(_) | Self::Timeout | Self::TryAgain => FailureClass::Retryable,
            Self::Http { status } if *status == 401 || (500..=599).contains(status) => {
                FailureClass::Retryable
            }
            Self::InvalidDelta(_) | Self::SignatureMismatch | Self::RevisionMismatch { .. } => {
                FailureClass::Malformed
            }
            Self::NotAMember
            | Self::InviteRevoked
            | Self::RequestDenied
            | Self::Http { .. }
            | Self::Other(_) => FailureClass::PermanentDiscard,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == FailureClass::Retryable
    }
}

/// Errors reported by the message sink.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The downstream pipeline could not take the batch right now.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// The downstream pipeline failed while handling the batch.
    #[error("Sink failed: {0}")]
    Failed(String),
}

/// Errors surfaced by the processor API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessorError {
    /// The message was rejected before it was stored.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The job store failed.
    #[error("Job store error: {0}")]
    Store(#[from] JobStoreError),

    /// Configuration cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The supervisor was shut down.
    #[error("Processor is shutting down")]
    ShuttingDown,
}
