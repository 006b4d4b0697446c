//! # Queue Supervisor
//!
//! Owns the live-worker table and starts at most one worker per group.
//!
//! ## Restart Without Races
//!
//! ```text
//! enqueue ──► store.add_job ──► lock ─┬─ worker live? ──► pending += group
//!                                     └─ none ─────────► claim + spawn
//!
//! worker  ──► clear pending ──► next_jobs ──► empty ──► lock ─┬─ pending? ──► loop
//!                                                             └─ release ──► re-drain
//! ```
//!
//! The table lock is a `parking_lot::Mutex` and is never held across an
//! `.await`.

use crate::application::deps::ProcessorDeps;
use crate::application::worker::GroupWorker;
use crate::config::ProcessorConfig;
use crate::domain::{ProcessorError, WorkerHandle, WorkerState};
use crate::ports::GroupMessageProcessorApi;
use async_trait::async_trait;
use gi_01_job_store::{JobId, NewJob};
use gi_02_discard_filter::{BlockList, DiscardFilter};
use parking_lot::Mutex;
use shared_bus::{InboxEvent, Subscription};
use shared_types::{GroupContext, GroupId, IncomingGroupMessage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Default)]
struct WorkerTable {
    live: HashMap<GroupId, WorkerHandle>,
    /// Groups that got new work while their worker was live.
    pending: HashSet<GroupId>,
}

/// State shared by the supervisor handle and every worker.
pub(crate) struct SupervisorInner {
    pub(crate) config: ProcessorConfig,
    pub(crate) deps: ProcessorDeps,
    pub(crate) filter: DiscardFilter<Arc<dyn BlockList>>,
    workers: Mutex<WorkerTable>,
    idle: Notify,
    shutdown: watch::Sender<bool>,
}

impl SupervisorInner {
    pub(crate) fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub(crate) fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Start a worker for every pending group that has none.
    pub(crate) async fn drain_all(self: &Arc<Self>) -> Result<usize, ProcessorError> {
        if self.is_shutting_down() || !self.deps.environment.is_processing_permitted() {
            debug!("[gi-03] Drain skipped, processing not permitted");
            return Ok(0);
        }

        let groups = self.deps.store.all_pending_group_ids().await?;
        if groups.is_empty() {
            debug!("[gi-03] Queue flushed");
            self.deps.bus.emit(InboxEvent::QueueFlushed);
            return Ok(0);
        }

        let started = groups
            .iter()
            .filter(|group_id| self.claim(group_id, false))
            .count();
        if started > 0 {
            info!(
                pending_groups = groups.len(),
                started, "[gi-03] Drained queue"
            );
        }
        Ok(started)
    }

    /// Claim the group and spawn its worker. If a worker is already live
    /// and `mark_pending` is set, it is told to look again before exiting.
    fn claim(self: &Arc<Self>, group_id: &GroupId, mark_pending: bool) -> bool {
        {
            let mut table = self.workers.lock();
            if table.live.contains_key(group_id) {
                if mark_pending {
                    table.pending.insert(group_id.clone());
                }
                return false;
            }
            if self.is_shutting_down() || !self.deps.environment.is_processing_permitted() {
                return false;
            }
            table.live.insert(
                group_id.clone(),
                WorkerHandle::new(group_id.clone(), self.config.initial_retry_delay()),
            );
        }
        self.spawn_worker(group_id.clone());
        true
    }

    fn spawn_worker(self: &Arc<Self>, group_id: GroupId) {
        debug!(group = %group_id, "[gi-03] Spawning worker");
        let worker = GroupWorker::new(group_id, Arc::clone(self));
        tokio::spawn(worker.run());
    }

    /// Called right before every batch fetch.
    pub(crate) fn will_fetch_next_jobs(&self, group_id: &GroupId) {
        self.workers.lock().pending.remove(group_id);
    }

    pub(crate) fn update_handle(&self, group_id: &GroupId, state: WorkerState, retry_delay: Duration) {
        if let Some(handle) = self.workers.lock().live.get_mut(group_id) {
            handle.state = state;
            handle.retry_delay = retry_delay;
        }
    }

    /// Release the handle unless new work arrived since the last fetch.
    /// Returns false if the worker must keep going.
    pub(crate) fn try_release(&self, group_id: &GroupId) -> bool {
        self.release(group_id, false)
    }

    /// Release the handle unconditionally (shutdown, processing gated).
    pub(crate) fn force_release(&self, group_id: &GroupId) {
        self.release(group_id, true);
    }

    fn release(&self, group_id: &GroupId, force: bool) -> bool {
        let now_idle = {
            let mut table = self.workers.lock();
            if table.pending.remove(group_id) && !force {
                return false;
            }
            table.live.remove(group_id);
            table.live.is_empty()
        };
        debug!(group = %group_id, "[gi-03] Worker finished");
        self.deps.bus.emit(InboxEvent::WorkerFinished {
            group_id: group_id.clone(),
        });
        if now_idle {
            self.idle.notify_waiters();
        }
        true
    }

    fn is_actively_processing(&self) -> bool {
        !self.workers.lock().live.is_empty()
    }
}

/// Entry point for incoming group messages.
///
/// Cheap to clone; every clone drives the same worker table.
#[derive(Clone)]
pub struct QueueSupervisor {
    inner: Arc<SupervisorInner>,
}

impl QueueSupervisor {
    pub fn new(config: ProcessorConfig, deps: ProcessorDeps) -> Result<Self, ProcessorError> {
        config.validate()?;
        let filter = DiscardFilter::new(Arc::clone(&deps.block_list));
        let (shutdown, _) = watch::channel(false);
        info!(
            batch_size = config.batch_size,
            background_batch_size = config.background_batch_size,
            initial_retry_ms = config.initial_retry_delay_ms,
            max_retry_ms = config.max_retry_delay_ms,
            "[gi-03] Queue supervisor created"
        );
        Ok(Self {
            inner: Arc::new(SupervisorInner {
                config,
                deps,
                filter,
                workers: Mutex::new(WorkerTable::default()),
                idle: Notify::new(),
                shutdown,
            }),
        })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.inner.config
    }

    /// Durably queue `message` and make sure its group has a worker.
    pub async fn enqueue(&self, message: IncomingGroupMessage) -> Result<JobId, ProcessorError> {
        if self.inner.is_shutting_down() {
            return Err(ProcessorError::ShuttingDown);
        }
        if message.group_id.is_empty() {
            return Err(ProcessorError::InvalidMessage("empty group id".to_string()));
        }
        if message.plaintext.is_empty() {
            return Err(ProcessorError::InvalidMessage("empty plaintext".to_string()));
        }

        let context = self
            .inner
            .deps
            .decoder
            .decode(&message.plaintext)
            .unwrap_or_else(|e| {
                warn!(
                    group = %message.group_id,
                    error = %e,
                    "[gi-03] Undecodable group context, job will be dropped"
                );
                GroupContext::default()
            });

        let group_id = message.group_id.clone();
        let job_id = self
            .inner
            .deps
            .store
            .add_job(NewJob {
                group_id: message.group_id,
                envelope: message.envelope,
                plaintext: message.plaintext,
                server_timestamp: message.server_timestamp,
                target_revision: context.revision,
                embedded_delta: context.embedded_delta,
            })
            .await?;

        debug!(
            group = %group_id,
            job_id = job_id.0,
            revision = ?context.revision,
            "[gi-03] Job enqueued"
        );
        self.inner.deps.bus.emit(InboxEvent::JobEnqueued {
            group_id: group_id.clone(),
            job_id: job_id.0,
        });
        self.inner.claim(&group_id, true);
        Ok(job_id)
    }

    /// Start a worker for every pending group that has none.
    pub async fn drain_all(&self) -> Result<usize, ProcessorError> {
        self.inner.drain_all().await
    }

    /// Re-drain on every wake signal until the bus closes or shutdown.
    pub fn spawn_signal_listener(&self, mut subscription: Subscription) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let mut shutdown = inner.shutdown_receiver();
        tokio::spawn(async move {
            info!("[gi-03] Wake listener started");
            loop {
                tokio::select! {
                    event = subscription.recv() => match event {
                        Some(InboxEvent::Wake(signal)) => {
                            debug!(signal = ?signal, "[gi-03] Wake received");
                            if let Err(e) = inner.drain_all().await {
                                warn!(error = %e, "[gi-03] Drain after wake failed");
                            }
                        }
                        Some(_) => {}
                        None => break,
                    },
                    _ = shutdown.changed() => break,
                }
            }
            info!("[gi-03] Wake listener stopped");
        })
    }

    pub fn is_actively_processing(&self) -> bool {
        self.inner.is_actively_processing()
    }

    pub async fn pending_job_count(&self, group_id: &GroupId) -> Result<u64, ProcessorError> {
        Ok(self.inner.deps.store.pending_job_count(group_id).await?)
    }

    pub async fn total_pending_job_count(&self) -> Result<u64, ProcessorError> {
        Ok(self.inner.deps.store.total_job_count().await?)
    }

    pub fn worker_handles(&self) -> Vec<WorkerHandle> {
        self.inner.workers.lock().live.values().cloned().collect()
    }

    /// True iff nothing is queued for the group and the local revision is
    /// not behind `context`.
    pub async fn can_process_immediately(
        &self,
        group_id: &GroupId,
        context: &GroupContext,
    ) -> Result<bool, ProcessorError> {
        let Some(revision) = context.revision else {
            return Ok(false);
        };
        if self.inner.deps.store.has_jobs(group_id).await? {
            return Ok(false);
        }
        let local = self.inner.deps.oracle.current_revision(group_id).await;
        Ok(local.is_some_and(|local| revision <= local))
    }

    /// Resolve once no worker is live.
    pub async fn wait_for_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_actively_processing() {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting jobs; workers stop at their next batch boundary.
    pub fn shutdown(&self) {
        info!("[gi-03] Shutting down queue supervisor");
        self.inner.shutdown.send_replace(true);
    }
}

#[async_trait]
impl GroupMessageProcessorApi for QueueSupervisor {
    async fn enqueue(&self, message: IncomingGroupMessage) -> Result<JobId, ProcessorError> {
        QueueSupervisor::enqueue(self, message).await
    }

    async fn drain_all(&self) -> Result<usize, ProcessorError> {
        QueueSupervisor::drain_all(self).await
    }

    fn is_actively_processing(&self) -> bool {
        QueueSupervisor::is_actively_processing(self)
    }

    async fn pending_job_count(&self, group_id: &GroupId) -> Result<u64, ProcessorError> {
        QueueSupervisor::pending_job_count(self, group_id).await
    }

    async fn total_pending_job_count(&self) -> Result<u64, ProcessorError> {
        QueueSupervisor::total_pending_job_count(self).await
    }

    fn worker_handles(&self) -> Vec<WorkerHandle> {
        QueueSupervisor::worker_handles(self)
    }

    async fn can_process_immediately(
        &self,
        group_id: &GroupId,
        context: &GroupContext,
    ) -> Result<bool, ProcessorError> {
        QueueSupervisor::can_process_immediately(self, group_id, context).await
    }
}
