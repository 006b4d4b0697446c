//! # Local Group State Oracle
//!
//! In-process stand-in for the group service. It keeps two views:
//!
//! - **published**: what the service would serve on a fetch, fed by
//!   `group_state` input lines;
//! - **local**: what this device knows, advanced only by embedded changes
//!   or by a refresh that copies the published state.

use async_trait::async_trait;
use gi_03_group_processor::{GroupStateOracle, OracleError};
use parking_lot::RwLock;
use shared_types::{EmbeddedDelta, GroupId, GroupState, Revision};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct LocalGroupStateOracle {
    local: RwLock<HashMap<GroupId, GroupState>>,
    published: RwLock<HashMap<GroupId, GroupState>>,
}

impl LocalGroupStateOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `state` what the service serves for its group.
    pub fn publish(&self, state: GroupState) {
        info!(
            group = %state.group_id,
            revision = state.revision,
            members = state.membership.full_member_count(),
            "[inbox] Group state published"
        );
        self.published.write().insert(state.group_id.clone(), state);
    }
}

#[async_trait]
impl GroupStateOracle for LocalGroupStateOracle {
    async fn current_revision(&self, group_id: &GroupId) -> Option<Revision> {
        self.local.read().get(group_id).map(|s| s.revision)
    }

    async fn group_state(&self, group_id: &GroupId) -> Option<GroupState> {
        self.local.read().get(group_id).cloned()
    }

    /// Membership changes are not modelled; a verified change only moves the
    /// revision forward.
    async fn apply_delta(
        &self,
        group_id: &GroupId,
        delta: &EmbeddedDelta,
        asserted: Revision,
    ) -> Result<Revision, OracleError> {
        if delta.change.is_empty() {
            return Err(OracleError::InvalidDelta("empty change".to_string()));
        }
        if delta.signature.is_empty() {
            return Err(OracleError::SignatureMismatch);
        }
        let mut local = self.local.write();
        let state = local.get_mut(group_id).ok_or(OracleError::NotAMember)?;
        if state.revision >= asserted {
            return Ok(state.revision);
        }
        let expected = state.revision.saturating_add(1);
        if delta.revision != expected || asserted != expected {
            return Err(OracleError::RevisionMismatch {
                expected,
                actual: delta.revision,
            });
        }
        state.revision = expected;
        debug!(group = %group_id, revision = expected, "[inbox] Embedded change applied");
        Ok(expected)
    }

    async fn refresh_to_revision(
        &self,
        group_id: &GroupId,
        at_least: Revision,
    ) -> Result<Revision, OracleError> {
        let published = self
            .published
            .read()
            .get(group_id)
            .cloned()
            .ok_or(OracleError::NotAMember)?;

        let mut local = self.local.write();
        let revision = match local.get(group_id) {
            Some(current) if current.revision >= published.revision => current.revision,
            _ => {
                let revision = published.revision;
                local.insert(group_id.clone(), published);
                revision
            }
        };
        debug!(group = %group_id, revision, at_least, "[inbox] Group state refreshed");
        Ok(revision)
    }
}
