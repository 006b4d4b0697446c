//! # Two-Step Reconciliation
//!
//! Brings the local group state up to the revision a single job asserts.
//!
//! ```text
//! embedded step ──AppliedLocally──────────────────────────► done
//!      │ NeedsRefresh
//!      ▼
//! refresh step ──AppliedLocally / RetryableError / PermanentDrop──► done
//! ```
//!
//! A permanent refresh failure is remembered together with the newest job
//! id at the time of the call. Every job of the group up to that id would
//! fail the same way, so those are dropped without another network call.

use crate::domain::{FailureClass, ReconcileOutcome};
use crate::ports::GroupStateOracle;
use gi_01_job_store::{JobId, JobStore, QueuedMessage};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-worker reconciliation state.
pub struct Reconciler {
    oracle: Arc<dyn GroupStateOracle>,
    store: Arc<dyn JobStore>,
    /// Jobs with an id at or below this one are known to fail the refresh.
    terminal_failure: Option<JobId>,
}

impl Reconciler {
    pub fn new(oracle: Arc<dyn GroupStateOracle>, store: Arc<dyn JobStore>) -> Self {
        Self {
            oracle,
            store,
            terminal_failure: None,
        }
    }

    /// Reconcile `job`. Never returns [`ReconcileOutcome::NeedsRefresh`].
    ///
    /// `skip_delta` bypasses the embedded change when the oracle already
    /// refused it.
    pub async fn reconcile(&mut self, job: &QueuedMessage, skip_delta: bool) -> ReconcileOutcome {
        match self.embedded_step(job, skip_delta).await {
            ReconcileOutcome::NeedsRefresh => self.refresh_step(job).await,
            outcome => outcome,
        }
    }

    /// Highest job id covered by a remembered permanent refresh failure.
    pub fn terminal_failure(&self) -> Option<JobId> {
        self.terminal_failure
    }

    async fn embedded_step(&self, job: &QueuedMessage, skip_delta: bool) -> ReconcileOutcome {
        let Some(target) = job.target_revision else {
            return ReconcileOutcome::PermanentDrop;
        };
        let current = self.oracle.current_revision(&job.group_id).await;
        if let Some(revision) = current.filter(|rev| *rev >= target) {
            debug!(
                group = %job.group_id,
                job_id = job.id.0,
                revision,
                "[gi-03] Already at target revision"
            );
            return ReconcileOutcome::AppliedLocally(revision);
        }

        let one_behind = current.and_then(|rev| rev.checked_add(1)) == Some(target);
        let delta = job
            .embedded_delta
            .as_ref()
            .filter(|delta| !skip_delta && one_behind && delta.is_structurally_valid(target));
        let Some(delta) = delta else {
            return ReconcileOutcome::NeedsRefresh;
        };

        match self.oracle.apply_delta(&job.group_id, delta, target).await {
            Ok(revision) => ReconcileOutcome::AppliedLocally(revision),
            Err(e) if e.class() == FailureClass::Retryable => ReconcileOutcome::RetryableError(e),
            Err(e) => {
                debug!(
                    group = %job.group_id,
                    job_id = job.id.0,
                    error = %e,
                    "[gi-03] Embedded change refused, falling back to refresh"
                );
                ReconcileOutcome::NeedsRefresh
            }
        }
    }

    async fn refresh_step(&mut self, job: &QueuedMessage) -> ReconcileOutcome {
        let Some(target) = job.target_revision else {
            return ReconcileOutcome::PermanentDrop;
        };
        if self.terminal_failure.is_some_and(|mark| job.id <= mark) {
            debug!(
                group = %job.group_id,
                job_id = job.id.0,
                "[gi-03] Covered by earlier refresh failure"
            );
            return ReconcileOutcome::PermanentDrop;
        }

        // Captured before the call: jobs added while it runs must get their
        // own refresh.
        let mark = match self.store.newest_job_id().await {
            Ok(Some(newest)) => newest.max(job.id),
            Ok(None) => job.id,
            Err(e) => {
                debug!(error = %e, "[gi-03] Could not read newest job id");
                job.id
            }
        };

        match self.oracle.refresh_to_revision(&job.group_id, target).await {
            Ok(revision) => {
                if revision < target {
                    warn!(
                        group = %job.group_id,
                        job_id = job.id.0,
                        revision,
                        target,
                        "[gi-03] Refresh ended below target revision"
                    );
                }
                ReconcileOutcome::AppliedLocally(revision)
            }
            Err(e) if e.is_retryable() => ReconcileOutcome::RetryableError(e),
            Err(e) => {
                warn!(
                    group = %job.group_id,
                    job_id = job.id.0,
                    covers_up_to = mark.0,
                    error = %e,
                    "[gi-03] Refresh failed permanently"
                );
                self.terminal_failure = Some(mark);
                ReconcileOutcome::PermanentDrop
            }
        }
    }
}
