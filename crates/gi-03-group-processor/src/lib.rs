//! # Group Message Processor (gi-03)
//!
//! Drains the job store group by group. For each batch it brings the local
//! group state up to the revision the messages assert, filters what the
//! local user must not see, and hands the rest to the message sink.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | 1 | One Worker Per Group | `application/supervisor.rs` - `claim()` under the table lock |
//! | 2 | Group Order | `domain/plan.rs` - planning stops at the first refresh job |
//! | 3 | Deliver Then Remove | `application/worker.rs` - `commit()` |
//! | 4 | Removal Iff Terminal | retryable failures keep the record and back off |
//! | 5 | No Lost Restart | `pending` flag checked in `try_release()` |
//!
//! ## Batch Lifecycle
//!
//! ```text
//! Idle → BatchFetching → BatchDeciding ─┬─ FastApply ───┬─ Completing → Idle
//!                                       └─ SlowRefresh ─┘        │
//!                                                                └─ Backoff
//! ```
//!
//! | Path | Batch | State Work |
//! |------|-------|------------|
//! | Fast | up to `batch_size` jobs (1 in background) | none, or embedded changes applied in order |
//! | Slow | exactly one job | embedded change, then `refresh_to_revision` |
//!
//! ## Failure Handling
//!
//! | Class | Examples | Reaction |
//! |-------|----------|----------|
//! | Retryable | network, timeout, 401, 5xx, try-again, store or sink I/O | keep job, back off |
//! | Permanent | not a member, invite revoked, request denied | remove without delivery |
//! | Malformed | bad delta, signature or revision mismatch | fall through to refresh |
//!
//! ## Module Structure
//!
//! ```text
//! gi-03-group-processor/
//! ├── config.rs         ProcessorConfig
//! ├── domain/           plan_batch, Backoff, errors, worker state
//! ├── ports/
//! │   ├── inbound.rs    GroupMessageProcessorApi
//! │   └── outbound.rs   GroupStateOracle, MessageSink, ProcessingEnvironment,
//! │                     GroupContextDecoder (+ mocks)
//! ├── adapters/         SharedEnvironment, BincodeContextDecoder
//! └── application/      QueueSupervisor, per-group worker, Reconciler
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::{BincodeContextDecoder, SharedEnvironment};
pub use application::{ProcessorDeps, QueueSupervisor, Reconciler};
pub use config::ProcessorConfig;
pub use domain::{
    plan_batch, Backoff, BatchPlan, DropReason, FailureClass, FastAction, OracleError,
    PlannedJob, ProcessorError, ReconcileOutcome, SinkError, WorkerHandle, WorkerState,
};
pub use ports::outbound::OracleCall;
pub use ports::{
    Delivery, GroupContextDecoder, GroupMessageProcessorApi, GroupStateOracle, MessageSink,
    MockGroupStateOracle, ProcessingEnvironment, RecordingSink,
};
