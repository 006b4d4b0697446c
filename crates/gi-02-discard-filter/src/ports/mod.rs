//! # Outbound Ports (Driven Ports)

use shared_types::{GroupId, ServiceId};
use std::sync::Arc;

/// Local block list lookups.
pub trait BlockList: Send + Sync {
    /// Whether messages from `sender` are blocked.
    fn is_sender_blocked(&self, sender: &ServiceId) -> bool;

    /// Whether the whole group is blocked.
    fn is_group_blocked(&self, group_id: &GroupId) -> bool;
}

impl<B: BlockList + ?Sized> BlockList for Arc<B> {
    fn is_sender_blocked(&self, sender: &ServiceId) -> bool {
        (**self).is_sender_blocked(sender)
    }

    fn is_group_blocked(&self, group_id: &GroupId) -> bool {
        (**self).is_group_blocked(group_id)
    }
}
