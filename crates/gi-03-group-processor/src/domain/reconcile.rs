//! # Reconcile Outcome

use crate::domain::errors::OracleError;
use shared_types::Revision;

/// Result of reconciling one job with the group state.
///
/// The embedded step yields `NeedsRefresh` to hand over to the refresh
/// step; the refresh step never yields it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Local state is at (or past) the job's revision.
    AppliedLocally(Revision),
    /// The embedded step could not help; a refresh is required.
    NeedsRefresh,
    /// Transient failure; keep the job and back off.
    RetryableError(OracleError),
    /// The job can never be processed; remove it without delivery.
    PermanentDrop,
}

impl ReconcileOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::AppliedLocally(_))
    }
}
