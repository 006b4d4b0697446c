//! # Job Records

use serde::{Deserialize, Serialize};
use shared_types::{EmbeddedDelta, EnvelopeMeta, GroupId, Revision};
use std::fmt;

/// Store-assigned job id. Strictly increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl JobId {
    /// Big-endian bytes; preserves numeric order under byte-wise comparison.
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A job as handed to [`crate::JobStore::add_job`], before an id exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub group_id: GroupId,
    pub envelope: EnvelopeMeta,
    pub plaintext: Vec<u8>,
    pub server_timestamp: u64,
    /// Revision asserted by the embedded group context; `None` if it
    /// could not be decoded.
    pub target_revision: Option<Revision>,
    pub embedded_delta: Option<EmbeddedDelta>,
}

/// A durable job record.
///
/// Removed from the store iff it was terminally handled: applied,
/// discarded, permanently failed, or dropped as malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: JobId,
    pub group_id: GroupId,
    pub envelope: EnvelopeMeta,
    pub plaintext: Vec<u8>,
    pub server_timestamp: u64,
    pub target_revision: Option<Revision>,
    pub embedded_delta: Option<EmbeddedDelta>,
    /// Retryable failures recorded against this job. Never reset.
    pub failure_count: u32,
    /// Wall clock at enqueue, diagnostics only.
    pub enqueued_at_ms: u64,
}

impl QueuedMessage {
    pub(crate) fn from_new(id: JobId, job: NewJob, enqueued_at_ms: u64) -> Self {
        Self {
            id,
            group_id: job.group_id,
            envelope: job.envelope,
            plaintext: job.plaintext,
            server_timestamp: job.server_timestamp,
            target_revision: job.target_revision,
            embedded_delta: job.embedded_delta,
            failure_count: 0,
            enqueued_at_ms,
        }
    }
}
