//! # Inbound Ports (Driving Ports)
//!
//! The API the group processor drives.

use crate::domain::entities::{JobId, NewJob, QueuedMessage};
use crate::domain::errors::JobStoreError;
use async_trait::async_trait;
use shared_types::GroupId;

/// Durable per-group job queue.
///
/// Implementations must be safe for concurrent callers. Every mutation is
/// atomic: after a crash the store holds either the state before or the
/// state after a call, never a mix.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a job and return its freshly assigned id.
    ///
    /// Returns only after the write is durable.
    async fn add_job(&self, job: NewJob) -> Result<JobId, JobStoreError>;

    /// Up to `limit` jobs of `group_id`, oldest first.
    async fn next_jobs(
        &self,
        group_id: &GroupId,
        limit: usize,
    ) -> Result<Vec<QueuedMessage>, JobStoreError>;

    /// Remove the given jobs in one atomic write. Unknown ids are ignored.
    async fn remove_jobs(&self, ids: &[JobId]) -> Result<(), JobStoreError>;

    /// Bump a job's failure counter; returns the new count.
    async fn record_failure(&self, id: JobId) -> Result<u32, JobStoreError>;

    /// Distinct groups with at least one stored job.
    async fn all_pending_group_ids(&self) -> Result<Vec<GroupId>, JobStoreError>;

    /// Number of stored jobs for one group.
    async fn pending_job_count(&self, group_id: &GroupId) -> Result<u64, JobStoreError>;

    /// Number of stored jobs across all groups.
    async fn total_job_count(&self) -> Result<u64, JobStoreError>;

    /// Highest id assigned so far, if any job was ever added.
    ///
    /// Any job added later gets a strictly greater id.
    async fn newest_job_id(&self) -> Result<Option<JobId>, JobStoreError>;

    /// Whether `group_id` has at least one stored job.
    async fn has_jobs(&self, group_id: &GroupId) -> Result<bool, JobStoreError> {
        Ok(self.pending_job_count(group_id).await? > 0)
    }
}
