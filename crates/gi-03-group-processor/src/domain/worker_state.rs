//! # Worker State

use serde::{Deserialize, Serialize};
use shared_types::GroupId;
use std::fmt;
use std::time::Duration;

/// Lifecycle of a per-group worker.
///
/// ```text
/// Idle → BatchFetching → BatchDeciding → {FastApply | SlowRefresh}
///      → Completing → (Idle | Backoff)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerState {
    Idle,
    BatchFetching,
    BatchDeciding,
    FastApply,
    SlowRefresh,
    Completing,
    Backoff,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Snapshot of a live worker. At most one exists per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    pub group_id: GroupId,
    /// True from spawn until the handle is released.
    pub is_draining: bool,
    /// Wait applied by the next (or current) backoff.
    pub retry_delay: Duration,
    pub state: WorkerState,
}

impl WorkerHandle {
    pub fn new(group_id: GroupId, retry_delay: Duration) -> Self {
        Self {
            group_id,
            is_draining: true,
            retry_delay,
            state: WorkerState::Idle,
        }
    }
}
