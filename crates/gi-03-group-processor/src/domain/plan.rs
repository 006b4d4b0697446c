//! # Batch Planning
//!
//! Splits the oldest jobs of a group into the next batch. A batch is either
//! a run of jobs that can be handled with local state only (possibly
//! advancing it with embedded deltas), or exactly one job that needs a
//! network refresh. Order within the group is never changed: planning
//! stops at the first job that would need a refresh once anything else is
//! planned.

use gi_01_job_store::{JobId, QueuedMessage};
use gi_02_discard_filter::DiscardMode;
use shared_types::{EmbeddedDelta, Revision, ServiceId};
use std::collections::HashSet;

/// Why a job is removed without delivery or reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Group context could not be decoded at enqueue time.
    MissingRevision,
    /// Envelope carried no sender.
    MissingSender,
}

/// What the worker does with one job of a fast batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastAction {
    /// Remove without delivering.
    Drop(DropReason),
    /// Blocked before any state work; remove without delivering.
    Discard,
    /// Local state is already recent enough.
    Deliver,
    /// Apply the embedded change, then deliver.
    ApplyDelta(EmbeddedDelta),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedJob {
    pub job: QueuedMessage,
    pub action: FastAction,
}

/// The next batch of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchPlan {
    /// Nothing to do.
    Empty,
    /// Jobs handled with local state only, in queue order.
    Fast(Vec<PlannedJob>),
    /// A single job that needs the refresh path.
    Slow(QueuedMessage),
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Fast(jobs) => jobs.len(),
            Self::Slow(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plan the next batch from `jobs` (oldest first).
///
/// `precheck` is the discard filter without the membership check.
/// `rejected_deltas` holds jobs whose embedded change the oracle already
/// refused; they always take the refresh path.
pub fn plan_batch<F>(
    jobs: Vec<QueuedMessage>,
    current_revision: Option<Revision>,
    rejected_deltas: &HashSet<JobId>,
    precheck: F,
) -> BatchPlan
where
    F: Fn(&ServiceId) -> DiscardMode,
{
    let mut projected = current_revision;
    let mut planned: Vec<PlannedJob> = Vec::new();

    for job in jobs {
        let action = match (job.target_revision, job.envelope.sender) {
            (None, _) => FastAction::Drop(DropReason::MissingRevision),
            (Some(_), None) => FastAction::Drop(DropReason::MissingSender),
            (Some(target), Some(sender)) => {
                if precheck(&sender) == DiscardMode::Discard {
                    FastAction::Discard
                } else if projected.is_some_and(|rev| target <= rev) {
                    FastAction::Deliver
                } else if let Some(delta) = usable_delta(&job, projected, rejected_deltas) {
                    projected = Some(target);
                    FastAction::ApplyDelta(delta)
                } else if planned.is_empty() {
                    return BatchPlan::Slow(job);
                } else {
                    break;
                }
            }
        };
        planned.push(PlannedJob { job, action });
    }

    if planned.is_empty() {
        BatchPlan::Empty
    } else {
        BatchPlan::Fast(planned)
    }
}

fn usable_delta(
    job: &QueuedMessage,
    projected: Option<Revision>,
    rejected_deltas: &HashSet<JobId>,
) -> Option<EmbeddedDelta> {
    let target = job.target_revision?;
    let current = projected?;
    let delta = job.embedded_delta.as_ref()?;
    (current.checked_add(1) == Some(target)
        && delta.is_structurally_valid(target)
        && !rejected_deltas.contains(&job.id))
    .then(|| delta.clone())
}
