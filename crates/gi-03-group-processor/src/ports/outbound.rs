//! # Outbound Ports
//!
//! Collaborators the processor depends on. Production implementations live
//! with the host (see `inbox-runtime`); mocks for tests are at the bottom.

use crate::domain::{OracleError, SinkError};
use async_trait::async_trait;
use gi_01_job_store::JobId;
use parking_lot::Mutex;
use shared_types::{
    CodecError, EmbeddedDelta, EnvelopeMeta, GroupContext, GroupId, GroupState, Revision,
    ServiceId,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Owner of local group state.
///
/// Treated as a black box that applies a change or a snapshot and reports
/// the resulting revision. Revisions only ever increase.
#[async_trait]
pub trait GroupStateOracle: Send + Sync {
    /// Locally known revision, `None` if the group is unknown.
    async fn current_revision(&self, group_id: &GroupId) -> Option<Revision>;

    /// Locally known state, `None` if the group is unknown.
    async fn group_state(&self, group_id: &GroupId) -> Option<GroupState>;

    /// Apply an embedded change asserted to produce `asserted`.
    async fn apply_delta(
        &self,
        group_id: &GroupId,
        delta: &EmbeddedDelta,
        asserted: Revision,
    ) -> Result<Revision, OracleError>;

    /// Fetch state from the service until the local revision is at least
    /// `at_least`. May return a lower revision if the service has nothing
    /// newer.
    async fn refresh_to_revision(
        &self,
        group_id: &GroupId,
        at_least: Revision,
    ) -> Result<Revision, OracleError>;
}

/// One admitted message handed downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub job_id: JobId,
    pub group_id: GroupId,
    pub plaintext: Vec<u8>,
    pub envelope: EnvelopeMeta,
    pub server_timestamp: u64,
    /// Deliver the side effects but suppress renderable content.
    pub discard_visible_content: bool,
}

/// Downstream message pipeline.
///
/// Delivery is at-least-once: a crash between delivery and removal
/// redelivers, so implementations must be idempotent per `job_id`.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver_batch(&self, deliveries: Vec<Delivery>) -> Result<(), SinkError>;
}

/// Process-level gates read at batch boundaries.
pub trait ProcessingEnvironment: Send + Sync {
    /// Registered and not suspended.
    fn is_processing_permitted(&self) -> bool;

    fn is_registered(&self) -> bool;

    /// Background mode shrinks batches.
    fn is_in_background(&self) -> bool;

    /// The local account, if registered.
    fn local_service_id(&self) -> Option<ServiceId>;
}

/// Extracts the group context framing from a decrypted plaintext.
pub trait GroupContextDecoder: Send + Sync {
    fn decode(&self, plaintext: &[u8]) -> Result<GroupContext, CodecError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Which oracle call a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleCall {
    ApplyDelta,
    Refresh,
}

/// In-memory oracle with scripted failures and call recording.
///
/// Deltas succeed when they follow the local revision by exactly one and
/// carry a non-empty signature. Refreshes install the configured remote
/// state (or bump the revision when none is configured).
#[derive(Default)]
pub struct MockGroupStateOracle {
    local: Mutex<HashMap<GroupId, GroupState>>,
    remote: Mutex<HashMap<GroupId, GroupState>>,
    scripted: Mutex<HashMap<OracleCall, VecDeque<OracleError>>>,
    refresh_calls: Mutex<Vec<(GroupId, Revision, tokio::time::Instant)>>,
    delta_calls: Mutex<Vec<(GroupId, Revision)>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockGroupStateOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutating call take `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Set the locally known state.
    pub fn set_local(&self, state: GroupState) {
        self.local.lock().insert(state.group_id.clone(), state);
    }

    /// Set what a refresh will fetch.
    pub fn set_remote(&self, state: GroupState) {
        self.remote.lock().insert(state.group_id.clone(), state);
    }

    /// Queue a failure for the next call of the given kind.
    pub fn fail_next(&self, call: OracleCall, error: OracleError) {
        self.scripted.lock().entry(call).or_default().push_back(error);
    }

    /// `(group, at_least)` of every refresh, in call order.
    pub fn refresh_calls(&self) -> Vec<(GroupId, Revision)> {
        self.refresh_calls
            .lock()
            .iter()
            .map(|(g, r, _)| (g.clone(), *r))
            .collect()
    }

    /// Instants at which refreshes started.
    pub fn refresh_instants(&self) -> Vec<tokio::time::Instant> {
        self.refresh_calls.lock().iter().map(|(_, _, at)| *at).collect()
    }

    /// `(group, asserted)` of every delta application, in call order.
    pub fn delta_calls(&self) -> Vec<(GroupId, Revision)> {
        self.delta_calls.lock().clone()
    }

    /// Highest number of concurrent mutating calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn scripted_failure(&self, call: OracleCall) -> Option<OracleError> {
        self.scripted.lock().get_mut(&call).and_then(VecDeque::pop_front)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn apply_delta_now(
        &self,
        group_id: &GroupId,
        delta: &EmbeddedDelta,
        asserted: Revision,
    ) -> Result<Revision, OracleError> {
        if let Some(err) = self.scripted_failure(OracleCall::ApplyDelta) {
            return Err(err);
        }
        if delta.signature.is_empty() {
            return Err(OracleError::SignatureMismatch);
        }
        let mut local = self.local.lock();
        let Some(state) = local.get_mut(group_id) else {
            return Err(OracleError::NotAMember);
        };
        if state.revision >= asserted {
            return Ok(state.revision);
        }
        if state.revision + 1 != delta.revision || delta.revision != asserted {
            return Err(OracleError::RevisionMismatch {
                expected: state.revision + 1,
                actual: delta.revision,
            });
        }
        state.revision = delta.revision;
        Ok(state.revision)
    }

    fn refresh_now(&self, group_id: &GroupId, at_least: Revision) -> Result<Revision, OracleError> {
        if let Some(err) = self.scripted_failure(OracleCall::Refresh) {
            return Err(err);
        }
        let remote = self.remote.lock().get(group_id).cloned();
        let mut local = self.local.lock();
        match (remote, local.get_mut(group_id)) {
            (Some(remote), Some(state)) if remote.revision > state.revision => {
                *state = remote;
                Ok(state.revision)
            }
            (Some(remote), None) => {
                let revision = remote.revision;
                local.insert(group_id.clone(), remote);
                Ok(revision)
            }
            (_, Some(state)) => {
                state.revision = state.revision.max(at_least);
                Ok(state.revision)
            }
            (None, None) => Err(OracleError::NotAMember),
        }
    }
}

#[async_trait]
impl GroupStateOracle for MockGroupStateOracle {
    async fn current_revision(&self, group_id: &GroupId) -> Option<Revision> {
        self.local.lock().get(group_id).map(|s| s.revision)
    }

    async fn group_state(&self, group_id: &GroupId) -> Option<GroupState> {
        self.local.lock().get(group_id).cloned()
    }

    async fn apply_delta(
        &self,
        group_id: &GroupId,
        delta: &EmbeddedDelta,
        asserted: Revision,
    ) -> Result<Revision, OracleError> {
        self.delta_calls.lock().push((group_id.clone(), asserted));
        self.enter().await;
        let result = self.apply_delta_now(group_id, delta, asserted);
        self.exit();
        result
    }

    async fn refresh_to_revision(
        &self,
        group_id: &GroupId,
        at_least: Revision,
    ) -> Result<Revision, OracleError> {
        self.refresh_calls
            .lock()
            .push((group_id.clone(), at_least, tokio::time::Instant::now()));
        self.enter().await;
        let result = self.refresh_now(group_id, at_least);
        self.exit();
        result
    }
}

/// Sink that records every batch and can be told to fail.
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<Delivery>>>,
    failures_left: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` calls.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Every successful batch, in call order.
    pub fn batches(&self) -> Vec<Vec<Delivery>> {
        self.batches.lock().clone()
    }

    /// Every delivery, flattened.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.batches.lock().iter().flatten().cloned().collect()
    }

    /// Plaintexts of each batch; handy for ordering assertions.
    pub fn batch_plaintexts(&self) -> Vec<Vec<Vec<u8>>> {
        self.batches
            .lock()
            .iter()
            .map(|b| b.iter().map(|d| d.plaintext.clone()).collect())
            .collect()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn deliver_batch(&self, deliveries: Vec<Delivery>) -> Result<(), SinkError> {
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(SinkError::Unavailable("scripted failure".to_string()));
        }
        self.batches.lock().push(deliveries);
        Ok(())
    }
}
