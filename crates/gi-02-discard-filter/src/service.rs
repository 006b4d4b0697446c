//! # Discard Filter Service

use crate::domain::{classify, DiscardContext, DiscardMode};
use crate::ports::BlockList;
use shared_types::{GroupId, GroupState, ServiceId};
use tracing::trace;

/// [`classify`] with an injected block list.
pub struct DiscardFilter<B: BlockList> {
    block_list: B,
}

impl<B: BlockList> DiscardFilter<B> {
    pub fn new(block_list: B) -> Self {
        Self { block_list }
    }

    pub fn block_list(&self) -> &B {
        &self.block_list
    }

    /// Classify one message from `sender` in `group_id`.
    pub fn classify(
        &self,
        sender: &ServiceId,
        group_id: &GroupId,
        check_membership: bool,
        local_service_id: Option<&ServiceId>,
        group_state: Option<&GroupState>,
    ) -> DiscardMode {
        let context = DiscardContext {
            sender_blocked: self.block_list.is_sender_blocked(sender),
            group_blocked: self.block_list.is_group_blocked(group_id),
            local_service_id,
            group_state,
        };
        let mode = classify(sender, group_id, check_membership, &context);
        trace!(
            group = %group_id,
            sender = %sender,
            check_membership,
            mode = ?mode,
            "[gi-02] Classified"
        );
        mode
    }
}
