//! # Test Fixtures
//!
//! A [`Harness`] wires the real supervisor to an in-memory job store, the
//! scripted [`MockGroupStateOracle`] and a [`RecordingSink`].

use async_trait::async_trait;
use gi_01_job_store::{
    InMemoryKVStore, JobId, JobStore, JobStoreError, KVStoreError, KvJobStore, NewJob,
    QueuedMessage,
};
use gi_02_discard_filter::InMemoryBlockList;
use gi_03_group_processor::{
    BincodeContextDecoder, MockGroupStateOracle, ProcessorConfig, ProcessorDeps, QueueSupervisor,
    RecordingSink, SharedEnvironment,
};
use shared_bus::InMemoryEventBus;
use shared_types::{
    EmbeddedDelta, EnvelopeMeta, GroupContext, GroupId, GroupMembership, GroupPlaintext,
    GroupState, IncomingGroupMessage, MemberRole, Revision, ServiceId,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn group(n: u8) -> GroupId {
    GroupId::new(vec![0x67, n])
}

pub fn memory_store() -> Arc<dyn JobStore> {
    Arc::new(KvJobStore::open(InMemoryKVStore::new()).expect("open in-memory store"))
}

/// Plaintext framing with `revision` and an optional embedded change.
pub fn plaintext(revision: Revision, delta: bool, body: &str) -> Vec<u8> {
    let mut context = GroupContext::at(revision);
    if delta {
        context = context.with_delta(EmbeddedDelta {
            revision,
            change: vec![0xc0],
            signature: vec![0x51],
        });
    }
    GroupPlaintext {
        context,
        body: body.as_bytes().to_vec(),
    }
    .encode()
    .expect("encode plaintext")
}

pub fn message(group_id: &GroupId, sender: ServiceId, revision: Revision, body: &str) -> IncomingGroupMessage {
    IncomingGroupMessage {
        group_id: group_id.clone(),
        plaintext: plaintext(revision, false, body),
        envelope: EnvelopeMeta::from_sender(sender),
        server_timestamp: 0,
    }
}

pub fn message_with_delta(
    group_id: &GroupId,
    sender: ServiceId,
    revision: Revision,
    body: &str,
) -> IncomingGroupMessage {
    IncomingGroupMessage {
        plaintext: plaintext(revision, true, body),
        ..message(group_id, sender, revision, body)
    }
}

/// Body text of every sink batch, in order.
pub fn batch_bodies(sink: &RecordingSink) -> Vec<Vec<String>> {
    sink.batch_plaintexts()
        .into_iter()
        .map(|batch| {
            batch
                .iter()
                .map(|bytes| {
                    let frame = GroupPlaintext::decode(bytes).expect("decode plaintext");
                    String::from_utf8_lossy(&frame.body).into_owned()
                })
                .collect()
        })
        .collect()
}

/// Full pipeline with scripted collaborators.
pub struct Harness {
    pub supervisor: QueueSupervisor,
    pub store: Arc<dyn JobStore>,
    pub oracle: Arc<MockGroupStateOracle>,
    pub sink: Arc<RecordingSink>,
    pub env: Arc<SharedEnvironment>,
    pub block_list: Arc<InMemoryBlockList>,
    pub bus: Arc<InMemoryEventBus>,
    pub local: ServiceId,
    /// A full member that is not an administrator.
    pub member: ServiceId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_parts(
            ProcessorConfig::for_testing(),
            memory_store(),
            Arc::new(MockGroupStateOracle::new()),
        )
    }

    pub fn with_store(store: Arc<dyn JobStore>) -> Self {
        Self::with_parts(
            ProcessorConfig::for_testing(),
            store,
            Arc::new(MockGroupStateOracle::new()),
        )
    }

    pub fn with_oracle(oracle: MockGroupStateOracle) -> Self {
        Self::with_parts(ProcessorConfig::for_testing(), memory_store(), Arc::new(oracle))
    }

    pub fn with_parts(
        config: ProcessorConfig,
        store: Arc<dyn JobStore>,
        oracle: Arc<MockGroupStateOracle>,
    ) -> Self {
        let local = ServiceId::random();
        let member = ServiceId::random();
        let bus = Arc::new(InMemoryEventBus::with_capacity(config.bus_capacity));
        let env = Arc::new(SharedEnvironment::registered(local).with_bus(Arc::clone(&bus)));
        let block_list = Arc::new(InMemoryBlockList::new());
        let sink = Arc::new(RecordingSink::new());

        let deps = ProcessorDeps {
            store: Arc::clone(&store),
            oracle: oracle.clone(),
            sink: sink.clone(),
            environment: env.clone(),
            decoder: Arc::new(BincodeContextDecoder),
            block_list: block_list.clone(),
            bus: Arc::clone(&bus),
        };
        let supervisor = QueueSupervisor::new(config, deps).expect("valid config");
        Self {
            supervisor,
            store,
            oracle,
            sink,
            env,
            block_list,
            bus,
            local,
            member,
        }
    }

    /// State of `group_id` at `revision` with the local user and `member`.
    pub fn state(&self, group_id: &GroupId, revision: Revision) -> GroupState {
        GroupState::new(
            group_id.clone(),
            revision,
            GroupMembership::new()
                .with_member(self.local, MemberRole::Default)
                .with_member(self.member, MemberRole::Default),
        )
    }

    /// Set the local state of `group_id` and publish the same membership
    /// at `remote_revision` for refreshes.
    pub fn seed(&self, group_id: &GroupId, local_revision: Revision, remote_revision: Revision) {
        self.oracle.set_local(self.state(group_id, local_revision));
        self.oracle.set_remote(self.state(group_id, remote_revision));
    }

    /// Enqueue while suspended so the whole queue is visible to the first
    /// batch.
    pub async fn enqueue_suspended(&self, messages: Vec<IncomingGroupMessage>) -> Vec<JobId> {
        self.env.set_suspended(true);
        let mut ids = Vec::with_capacity(messages.len());
        for message in messages {
            ids.push(self.supervisor.enqueue(message).await.expect("enqueue"));
        }
        ids
    }

    /// Resume processing and start workers.
    pub async fn resume(&self) -> usize {
        self.env.set_suspended(false);
        self.supervisor.drain_all().await.expect("drain")
    }

    /// Wait until no worker is live.
    pub async fn settle(&self) {
        tokio::time::timeout(Duration::from_secs(30), self.supervisor.wait_for_idle())
            .await
            .expect("queue did not settle");
    }

    pub async fn pending(&self) -> u64 {
        self.supervisor
            .total_pending_job_count()
            .await
            .expect("count jobs")
    }

    /// Jobs still queued for `group_id`, oldest first.
    pub async fn queued(&self, group_id: &GroupId) -> Vec<QueuedMessage> {
        self.store.next_jobs(group_id, 1_000).await.expect("read jobs")
    }
}

/// Job store that fails a number of `remove_jobs` calls before delegating.
pub struct FlakyStore {
    inner: Arc<dyn JobStore>,
    remove_failures: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn JobStore>, remove_failures: usize) -> Self {
        Self {
            inner,
            remove_failures: AtomicUsize::new(remove_failures),
        }
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn add_job(&self, job: NewJob) -> Result<JobId, JobStoreError> {
        self.inner.add_job(job).await
    }

    async fn next_jobs(&self, group_id: &GroupId, limit: usize) -> Result<Vec<QueuedMessage>, JobStoreError> {
        self.inner.next_jobs(group_id, limit).await
    }

    async fn remove_jobs(&self, ids: &[JobId]) -> Result<(), JobStoreError> {
        let fail = self
            .remove_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(JobStoreError::Storage(KVStoreError::IOError {
                message: "disk busy".to_string(),
            }));
        }
        self.inner.remove_jobs(ids).await
    }

    async fn record_failure(&self, id: JobId) -> Result<u32, JobStoreError> {
        self.inner.record_failure(id).await
    }

    async fn all_pending_group_ids(&self) -> Result<Vec<GroupId>, JobStoreError> {
        self.inner.all_pending_group_ids().await
    }

    async fn pending_job_count(&self, group_id: &GroupId) -> Result<u64, JobStoreError> {
        self.inner.pending_job_count(group_id).await
    }

    async fn total_job_count(&self) -> Result<u64, JobStoreError> {
        self.inner.total_job_count().await
    }

    async fn newest_job_id(&self) -> Result<Option<JobId>, JobStoreError> {
        self.inner.newest_job_id().await
    }
}
