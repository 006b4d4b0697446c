//! # Per-Group Worker
//!
//! Drains one group's jobs batch by batch until the group is empty, the
//! process stops permitting work, or the supervisor shuts down. Loops,
//! never recurses.

use crate::application::reconcile::Reconciler;
use crate::application::supervisor::SupervisorInner;
use crate::domain::{
    plan_batch, Backoff, BatchPlan, FastAction, PlannedJob, ReconcileOutcome, WorkerState,
};
use crate::ports::Delivery;
use gi_01_job_store::{JobId, QueuedMessage};
use gi_02_discard_filter::DiscardMode;
use shared_bus::{EventFilter, Subscription};
use shared_types::{GroupId, GroupState, ServiceId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How a batch ended.
#[derive(Debug)]
enum BatchOutcome {
    /// No jobs left at fetch time.
    Drained,
    /// At least one job was terminally handled.
    Progress,
    /// Nothing committed, plan again right away.
    Replan,
    /// Transient failure; back off before the next batch.
    Retry,
}

pub(crate) struct GroupWorker {
    group_id: GroupId,
    inner: Arc<SupervisorInner>,
    wakes: Subscription,
    shutdown: watch::Receiver<bool>,
    backoff: Backoff,
    reconciler: Reconciler,
    /// Jobs whose embedded change the oracle refused.
    rejected_deltas: HashSet<JobId>,
}

impl GroupWorker {
    /// Subscribes to wake signals immediately so nothing sent after spawn
    /// is missed.
    pub(crate) fn new(group_id: GroupId, inner: Arc<SupervisorInner>) -> Self {
        let wakes = inner.deps.bus.subscribe(EventFilter::wake());
        let shutdown = inner.shutdown_receiver();
        let backoff = Backoff::new(
            inner.config.initial_retry_delay(),
            inner.config.max_retry_delay(),
        );
        let reconciler = Reconciler::new(
            Arc::clone(&inner.deps.oracle),
            Arc::clone(&inner.deps.store),
        );
        Self {
            group_id,
            inner,
            wakes,
            shutdown,
            backoff,
            reconciler,
            rejected_deltas: HashSet::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(group = %self.group_id, "[gi-03] Worker started");

        loop {
            if self.inner.is_shutting_down() {
                self.inner.force_release(&self.group_id);
                return;
            }
            if !self.inner.deps.environment.is_processing_permitted() {
                info!(group = %self.group_id, "[gi-03] Processing not permitted, worker parked");
                self.inner.force_release(&self.group_id);
                return;
            }

            match self.run_batch().await {
                BatchOutcome::Drained => {
                    self.set_state(WorkerState::Completing);
                    if self.inner.try_release(&self.group_id) {
                        break;
                    }
                    debug!(group = %self.group_id, "[gi-03] New work arrived while draining");
                }
                BatchOutcome::Progress => {
                    self.backoff.reset();
                    self.set_state(WorkerState::Idle);
                    self.pause_between_batches().await;
                }
                BatchOutcome::Replan => {}
                BatchOutcome::Retry => self.wait_for_retry().await,
            }
        }

        if let Err(e) = self.inner.drain_all().await {
            warn!(group = %self.group_id, error = %e, "[gi-03] Re-drain after worker exit failed");
        }
    }

    async fn run_batch(&mut self) -> BatchOutcome {
        let inner = Arc::clone(&self.inner);
        let group_id = self.group_id.clone();

        self.set_state(WorkerState::BatchFetching);
        inner.will_fetch_next_jobs(&group_id);
        // Anything buffered so far predates this fetch.
        self.wakes.drain_pending();

        let background = inner.deps.environment.is_in_background();
        let limit = if background {
            inner.config.background_batch_size
        } else {
            inner.config.batch_size
        };
        let jobs = match inner.deps.store.next_jobs(&group_id, limit).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(group = %group_id, error = %e, "[gi-03] Fetching jobs failed");
                return BatchOutcome::Retry;
            }
        };
        if jobs.is_empty() {
            return BatchOutcome::Drained;
        }

        self.set_state(WorkerState::BatchDeciding);
        let current = inner.deps.oracle.current_revision(&group_id).await;
        let plan = plan_batch(jobs, current, &self.rejected_deltas, |sender| {
            inner.filter.classify(sender, &group_id, false, None, None)
        });
        debug!(
            group = %group_id,
            revision = ?current,
            planned = plan.len(),
            slow = matches!(plan, BatchPlan::Slow(_)),
            "[gi-03] Batch planned"
        );

        match plan {
            BatchPlan::Empty => BatchOutcome::Drained,
            BatchPlan::Fast(mut planned) => {
                if background {
                    planned.truncate(1);
                }
                self.apply_fast(planned).await
            }
            BatchPlan::Slow(job) => self.apply_slow(job).await,
        }
    }

    async fn apply_fast(&mut self, planned: Vec<PlannedJob>) -> BatchOutcome {
        self.set_state(WorkerState::FastApply);
        let oracle = Arc::clone(&self.inner.deps.oracle);
        let local = self.inner.deps.environment.local_service_id();

        let mut handled: Vec<JobId> = Vec::with_capacity(planned.len());
        let mut deliveries: Vec<Delivery> = Vec::new();
        let mut state: Option<Option<GroupState>> = None;
        let mut retry = false;

        for PlannedJob { job, action } in planned {
            match action {
                FastAction::Drop(reason) => {
                    warn!(
                        group = %self.group_id,
                        job_id = job.id.0,
                        reason = ?reason,
                        "[gi-03] Dropping malformed job"
                    );
                    handled.push(job.id);
                    continue;
                }
                FastAction::Discard => {
                    debug!(group = %self.group_id, job_id = job.id.0, "[gi-03] Blocked, discarded");
                    handled.push(job.id);
                    continue;
                }
                FastAction::Deliver => {}
                FastAction::ApplyDelta(delta) => {
                    match oracle.apply_delta(&self.group_id, &delta, delta.revision).await {
                        Ok(revision) => {
                            debug!(
                                group = %self.group_id,
                                job_id = job.id.0,
                                revision,
                                "[gi-03] Embedded change applied"
                            );
                            state = None;
                        }
                        Err(e) if e.is_retryable() => {
                            warn!(
                                group = %self.group_id,
                                job_id = job.id.0,
                                error = %e,
                                "[gi-03] Embedded change failed, will retry"
                            );
                            self.record_failure(job.id).await;
                            retry = true;
                            break;
                        }
                        Err(e) => {
                            info!(
                                group = %self.group_id,
                                job_id = job.id.0,
                                error = %e,
                                "[gi-03] Embedded change refused, job will refresh"
                            );
                            self.rejected_deltas.insert(job.id);
                            break;
                        }
                    }
                }
            }

            if state.is_none() {
                state = Some(oracle.group_state(&self.group_id).await);
            }
            let group_state = state.as_ref().and_then(Option::as_ref);
            handled.push(job.id);
            deliveries.extend(self.admit(job, local.as_ref(), group_state));
        }

        if handled.is_empty() {
            return if retry {
                BatchOutcome::Retry
            } else {
                BatchOutcome::Replan
            };
        }
        if self.commit(deliveries, handled).await && !retry {
            BatchOutcome::Progress
        } else {
            BatchOutcome::Retry
        }
    }

    async fn apply_slow(&mut self, job: QueuedMessage) -> BatchOutcome {
        self.set_state(WorkerState::SlowRefresh);
        let skip_delta = self.rejected_deltas.contains(&job.id);

        match self.reconciler.reconcile(&job, skip_delta).await {
            ReconcileOutcome::AppliedLocally(revision) => {
                debug!(
                    group = %self.group_id,
                    job_id = job.id.0,
                    revision,
                    "[gi-03] Reconciled"
                );
                let state = self.inner.deps.oracle.group_state(&self.group_id).await;
                let local = self.inner.deps.environment.local_service_id();
                let id = job.id;
                let deliveries = self
                    .admit(job, local.as_ref(), state.as_ref())
                    .into_iter()
                    .collect();
                self.committed(deliveries, vec![id]).await
            }
            ReconcileOutcome::PermanentDrop => {
                warn!(
                    group = %self.group_id,
                    job_id = job.id.0,
                    target = ?job.target_revision,
                    "[gi-03] Group state unavailable, dropping job"
                );
                self.committed(Vec::new(), vec![job.id]).await
            }
            ReconcileOutcome::RetryableError(e) => {
                warn!(
                    group = %self.group_id,
                    job_id = job.id.0,
                    error = %e,
                    "[gi-03] Reconcile failed, will retry"
                );
                self.record_failure(job.id).await;
                BatchOutcome::Retry
            }
            ReconcileOutcome::NeedsRefresh => {
                warn!(group = %self.group_id, job_id = job.id.0, "[gi-03] Reconcile did not settle");
                BatchOutcome::Retry
            }
        }
    }

    /// Classify with the membership check; `None` means discard.
    fn admit(
        &self,
        job: QueuedMessage,
        local: Option<&ServiceId>,
        state: Option<&GroupState>,
    ) -> Option<Delivery> {
        let sender = job.envelope.sender?;
        let discard_visible_content = match self
            .inner
            .filter
            .classify(&sender, &self.group_id, true, local, state)
        {
            DiscardMode::Discard => {
                debug!(
                    group = %self.group_id,
                    job_id = job.id.0,
                    sender = %sender,
                    "[gi-03] Not admitted, discarded"
                );
                return None;
            }
            DiscardMode::DiscardVisibleContent => true,
            DiscardMode::Admit => false,
        };
        Some(Delivery {
            job_id: job.id,
            group_id: job.group_id,
            plaintext: job.plaintext,
            envelope: job.envelope,
            server_timestamp: job.server_timestamp,
            discard_visible_content,
        })
    }

    async fn committed(&mut self, deliveries: Vec<Delivery>, handled: Vec<JobId>) -> BatchOutcome {
        if self.commit(deliveries, handled).await {
            BatchOutcome::Progress
        } else {
            BatchOutcome::Retry
        }
    }

    /// Deliver, then remove. A crash in between redelivers.
    async fn commit(&mut self, deliveries: Vec<Delivery>, handled: Vec<JobId>) -> bool {
        self.set_state(WorkerState::Completing);
        let delivered = deliveries.len();

        if !deliveries.is_empty() {
            if let Err(e) = self.inner.deps.sink.deliver_batch(deliveries).await {
                warn!(group = %self.group_id, error = %e, "[gi-03] Sink rejected batch");
                return false;
            }
        }
        if let Err(e) = self.inner.deps.store.remove_jobs(&handled).await {
            warn!(group = %self.group_id, error = %e, "[gi-03] Removing handled jobs failed");
            return false;
        }

        for id in &handled {
            self.rejected_deltas.remove(id);
        }
        debug!(
            group = %self.group_id,
            handled = handled.len(),
            delivered,
            "[gi-03] Batch committed"
        );
        true
    }

    async fn record_failure(&self, id: JobId) {
        match self.inner.deps.store.record_failure(id).await {
            Ok(count) => {
                debug!(group = %self.group_id, job_id = id.0, count, "[gi-03] Failure recorded")
            }
            Err(e) => {
                debug!(group = %self.group_id, job_id = id.0, error = %e, "[gi-03] Could not record failure")
            }
        }
    }

    /// Backoff. The delay grows on every scheduled retry; a wake seen during
    /// the batch or the wait only races the timer.
    async fn wait_for_retry(&mut self) {
        let delay = self.backoff.schedule_retry();
        if self.wakes.drain_pending() {
            debug!(
                group = %self.group_id,
                next_delay_ms = self.backoff.current_delay().as_millis() as u64,
                "[gi-03] Woken during batch, retrying now"
            );
            return;
        }

        self.inner.update_handle(&self.group_id, WorkerState::Backoff, delay);
        warn!(
            group = %self.group_id,
            delay_ms = delay.as_millis() as u64,
            retries = self.backoff.retries(),
            "[gi-03] Backing off"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            event = self.wakes.recv() => {
                debug!(group = %self.group_id, event = ?event, "[gi-03] Backoff cut short");
            }
            _ = self.shutdown.changed() => {}
        }
    }

    async fn pause_between_batches(&mut self) {
        let spacing = self.inner.config.batch_spacing();
        if spacing.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(spacing) => {}
            _ = self.shutdown.changed() => {}
        }
    }

    fn set_state(&self, state: WorkerState) {
        self.inner
            .update_handle(&self.group_id, state, self.backoff.current_delay());
    }
}
