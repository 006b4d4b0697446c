//! Adapters layer.

use crate::ports::BlockList;
use parking_lot::RwLock;
use shared_types::{GroupId, ServiceId};
use std::collections::HashSet;
use tracing::debug;

/// Thread-safe in-memory block list.
#[derive(Debug, Default)]
pub struct InMemoryBlockList {
    senders: RwLock<HashSet<ServiceId>>,
    groups: RwLock<HashSet<GroupId>>,
}

impl InMemoryBlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_sender(&self, sender: ServiceId) {
        debug!(sender = %sender, "[gi-02] Sender blocked");
        self.senders.write().insert(sender);
    }

    pub fn unblock_sender(&self, sender: &ServiceId) {
        self.senders.write().remove(sender);
    }

    pub fn block_group(&self, group_id: GroupId) {
        debug!(group = %group_id, "[gi-02] Group blocked");
        self.groups.write().insert(group_id);
    }

    pub fn unblock_group(&self, group_id: &GroupId) {
        self.groups.write().remove(group_id);
    }
}

impl BlockList for InMemoryBlockList {
    fn is_sender_blocked(&self, sender: &ServiceId) -> bool {
        self.senders.read().contains(sender)
    }

    fn is_group_blocked(&self, group_id: &GroupId) -> bool {
        self.groups.read().contains(group_id)
    }
}
