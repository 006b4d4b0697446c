//! # Application Layer
//!
//! The queue supervisor, its per-group workers, and the two-step
//! reconciliation they run for jobs that need more than local state.

pub mod deps;
pub mod reconcile;
pub mod supervisor;
mod worker;

pub use deps::ProcessorDeps;
pub use reconcile::Reconciler;
pub use supervisor::QueueSupervisor;
