//! # Domain Layer
//!
//! Pure decision logic: batch planning, backoff, reconcile outcomes, worker
//! state, and the error taxonomy. No I/O.

pub mod backoff;
pub mod errors;
pub mod plan;
pub mod reconcile;
pub mod worker_state;

pub use backoff::Backoff;
pub use errors::{FailureClass, OracleError, ProcessorError, SinkError};
pub use plan::{plan_batch, BatchPlan, DropReason, FastAction, PlannedJob};
pub use reconcile::ReconcileOutcome;
pub use worker_state::{WorkerHandle, WorkerState};
