//! # Inbound Ports
//!
//! The API the transport layer drives.

use crate::domain::{ProcessorError, WorkerHandle};
use async_trait::async_trait;
use gi_01_job_store::JobId;
use shared_types::{GroupContext, GroupId, IncomingGroupMessage};

/// Group message processing API.
#[async_trait]
pub trait GroupMessageProcessorApi: Send + Sync {
    /// Durably queue a decrypted group message and make sure a worker for
    /// its group is running. Returns only after the store write succeeded.
    async fn enqueue(&self, message: IncomingGroupMessage) -> Result<JobId, ProcessorError>;

    /// Start a worker for every group with pending jobs that has none.
    /// Returns the number of workers started.
    async fn drain_all(&self) -> Result<usize, ProcessorError>;

    /// Whether any worker is live.
    fn is_actively_processing(&self) -> bool;

    /// Jobs queued for one group.
    async fn pending_job_count(&self, group_id: &GroupId) -> Result<u64, ProcessorError>;

    /// Jobs queued across all groups.
    async fn total_pending_job_count(&self) -> Result<u64, ProcessorError>;

    /// Snapshot of live workers.
    fn worker_handles(&self) -> Vec<WorkerHandle>;

    /// Whether a message with `context` could skip the queue: nothing is
    /// queued for the group and local state is already at its revision.
    async fn can_process_immediately(
        &self,
        group_id: &GroupId,
        context: &GroupContext,
    ) -> Result<bool, ProcessorError>;
}
