//! # Job Store Service
//!
//! `KvJobStore` implements [`JobStore`] over any [`KeyValueStore`].
//!
//! All reads and writes happen under one `parking_lot::Mutex`, which is
//! never held across an `.await` (the KV port is synchronous). Backends
//! that report [`KeyValueStore::blocks_on_io`] run each call through
//! `tokio::task::spawn_blocking`, so a synced RocksDB write never stalls a
//! runtime worker thread.

use crate::domain::entities::{JobId, NewJob, QueuedMessage};
use crate::domain::errors::{JobStoreError, KVStoreError};
use crate::domain::keys;
use crate::ports::inbound::JobStore;
use crate::ports::outbound::{BatchOperation, KeyValueStore, SystemTimeSource, TimeSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::GroupId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// First id handed out by a fresh store.
const FIRST_JOB_ID: u64 = 1;

struct Inner<S> {
    kv: S,
    next_id: u64,
}

impl<S: KeyValueStore> Inner<S> {
    fn count(&self, group_id: &GroupId) -> Result<u64, KVStoreError> {
        match self.kv.get(&keys::count_key(group_id))? {
            Some(bytes) => keys::decode_u64(&bytes),
            None => Ok(0),
        }
    }

    fn load(&self, id: JobId) -> Result<Option<(GroupId, QueuedMessage)>, JobStoreError> {
        let Some(group_bytes) = self.kv.get(&keys::index_key(id))? else {
            return Ok(None);
        };
        let group_id = GroupId::new(group_bytes);
        let Some(raw) = self.kv.get(&keys::job_key(&group_id, id))? else {
            return Err(KVStoreError::CorruptionError {
                message: format!("index entry without record for job {}", id),
            }
            .into());
        };
        let job: QueuedMessage = bincode::deserialize(&raw)?;
        Ok(Some((group_id, job)))
    }
}

/// Job store over a key-value backend.
pub struct KvJobStore<S: KeyValueStore> {
    inner: Arc<Mutex<Inner<S>>>,
    blocking: bool,
    clock: Arc<dyn TimeSource>,
}

impl<S: KeyValueStore> KvJobStore<S> {
    /// Open a job store over `kv`, resuming the persisted id counter.
    pub fn open(kv: S) -> Result<Self, JobStoreError> {
        Self::with_clock(kv, Arc::new(SystemTimeSource))
    }

    /// Open with an explicit time source.
    pub fn with_clock(kv: S, clock: Arc<dyn TimeSource>) -> Result<Self, JobStoreError> {
        let next_id = match kv.get(keys::NEXT_JOB_ID_KEY)? {
            Some(bytes) => keys::decode_u64(&bytes)?,
            None => FIRST_JOB_ID,
        };
        let blocking = kv.blocks_on_io();

        info!(next_job_id = next_id, blocking, "[gi-01] Job store opened");

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { kv, next_id })),
            blocking,
            clock,
        })
    }

    /// Consume the store and hand back the KV backend.
    ///
    /// `None` while a blocking call still holds the store.
    pub fn into_inner(self) -> Option<S> {
        Arc::try_unwrap(self.inner)
            .ok()
            .map(|inner| inner.into_inner().kv)
    }
}

impl<S: KeyValueStore + 'static> KvJobStore<S> {
    /// Run `op` under the store lock, on the blocking pool if the backend
    /// blocks on I/O.
    async fn with_store<T, F>(&self, op: F) -> Result<T, JobStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Inner<S>) -> Result<T, JobStoreError> + Send + 'static,
    {
        if !self.blocking {
            return op(&mut self.inner.lock());
        }
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&mut inner.lock()))
            .await
            .map_err(|e| KVStoreError::IOError {
                message: format!("blocking store task failed: {e}"),
            })?
    }
}

#[async_trait]
impl<S: KeyValueStore + 'static> JobStore for KvJobStore<S> {
    async fn add_job(&self, job: NewJob) -> Result<JobId, JobStoreError> {
        if job.group_id.is_empty() {
            return Err(JobStoreError::InvalidJob("empty group id".to_string()));
        }

        let now = self.clock.now_ms();
        self.with_store(move |inner| {
            let id = JobId(inner.next_id);
            let group_id = job.group_id.clone();
            let count = inner.count(&group_id)?;
            let record = QueuedMessage::from_new(id, job, now);
            let encoded = bincode::serialize(&record)?;

            inner.kv.write_batch(vec![
                BatchOperation::put(keys::job_key(&group_id, id), encoded),
                BatchOperation::put(keys::index_key(id), group_id.as_bytes().to_vec()),
                BatchOperation::put(keys::count_key(&group_id), keys::encode_u64(count + 1)),
                BatchOperation::put(keys::NEXT_JOB_ID_KEY.to_vec(), keys::encode_u64(id.0 + 1)),
            ])?;
            inner.next_id = id.0 + 1;

            debug!(group = %group_id, job_id = %id, pending = count + 1, "[gi-01] Job stored");
            Ok(id)
        })
        .await
    }

    async fn next_jobs(
        &self,
        group_id: &GroupId,
        limit: usize,
    ) -> Result<Vec<QueuedMessage>, JobStoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let prefix = keys::group_prefix(group_id);
        self.with_store(move |inner| {
            inner
                .kv
                .scan_prefix(&prefix, Some(limit))?
                .into_iter()
                .map(|(_, raw)| bincode::deserialize(&raw).map_err(JobStoreError::from))
                .collect()
        })
        .await
    }

    async fn remove_jobs(&self, ids: &[JobId]) -> Result<(), JobStoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let requested = ids.len();
        let unique: BTreeSet<JobId> = ids.iter().copied().collect();

        self.with_store(move |inner| {
            let mut ops = Vec::with_capacity(unique.len() * 2);
            let mut removed_per_group: BTreeMap<GroupId, u64> = BTreeMap::new();

            for id in unique {
                let Some(group_bytes) = inner.kv.get(&keys::index_key(id))? else {
                    continue;
                };
                let group_id = GroupId::new(group_bytes);
                ops.push(BatchOperation::delete(keys::job_key(&group_id, id)));
                ops.push(BatchOperation::delete(keys::index_key(id)));
                *removed_per_group.entry(group_id).or_insert(0) += 1;
            }

            if ops.is_empty() {
                return Ok(());
            }

            for (group_id, removed) in &removed_per_group {
                let remaining = inner.count(group_id)?.saturating_sub(*removed);
                if remaining == 0 {
                    ops.push(BatchOperation::delete(keys::count_key(group_id)));
                } else {
                    ops.push(BatchOperation::put(
                        keys::count_key(group_id),
                        keys::encode_u64(remaining),
                    ));
                }
            }

            inner.kv.write_batch(ops)?;
            debug!(removed = requested, groups = removed_per_group.len(), "[gi-01] Jobs removed");
            Ok(())
        })
        .await
    }

    async fn record_failure(&self, id: JobId) -> Result<u32, JobStoreError> {
        self.with_store(move |inner| {
            let Some((group_id, mut job)) = inner.load(id)? else {
                return Err(JobStoreError::NotFound(id));
            };
            job.failure_count = job.failure_count.saturating_add(1);
            let encoded = bincode::serialize(&job)?;
            inner.kv.write_batch(vec![BatchOperation::put(
                keys::job_key(&group_id, id),
                encoded,
            )])?;
            Ok(job.failure_count)
        })
        .await
    }

    async fn all_pending_group_ids(&self) -> Result<Vec<GroupId>, JobStoreError> {
        self.with_store(|inner| {
            inner
                .kv
                .scan_prefix(keys::COUNT_PREFIX, None)?
                .into_iter()
                .map(|(key, _)| keys::group_from_count_key(&key).map_err(JobStoreError::from))
                .collect()
        })
        .await
    }

    async fn pending_job_count(&self, group_id: &GroupId) -> Result<u64, JobStoreError> {
        let group_id = group_id.clone();
        self.with_store(move |inner| Ok(inner.count(&group_id)?))
            .await
    }

    async fn total_job_count(&self) -> Result<u64, JobStoreError> {
        self.with_store(|inner| {
            let mut total = 0u64;
            for (_, value) in inner.kv.scan_prefix(keys::COUNT_PREFIX, None)? {
                total += keys::decode_u64(&value)?;
            }
            Ok(total)
        })
        .await
    }

    async fn newest_job_id(&self) -> Result<Option<JobId>, JobStoreError> {
        let next = self.inner.lock().next_id;
        Ok((next > FIRST_JOB_ID).then(|| JobId(next - 1)))
    }
}
