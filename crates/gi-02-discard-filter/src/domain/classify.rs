use serde::{Deserialize, Serialize};
use shared_types::{GroupId, GroupState, ServiceId};

/// What to do with a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscardMode {
    /// Drop the message entirely.
    Discard,
    /// Deliver, but suppress renderable content (non-admin post in an
    /// announcements-only group).
    DiscardVisibleContent,
    /// Deliver normally.
    Admit,
}

impl DiscardMode {
    /// True unless the message is dropped entirely.
    pub fn is_delivered(self) -> bool {
        !matches!(self, Self::Discard)
    }
}

/// Everything `classify` reads besides the message itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardContext<'a> {
    pub sender_blocked: bool,
    pub group_blocked: bool,
    /// The local account, if registered.
    pub local_service_id: Option<&'a ServiceId>,
    /// Local snapshot of the group, if known.
    pub group_state: Option<&'a GroupState>,
}

/// Pure discard decision. See the crate docs for the decision table.
///
/// A `group_state` for a different group than `group_id` counts as unknown.
pub fn classify(
    sender: &ServiceId,
    group_id: &GroupId,
    check_membership: bool,
    context: &DiscardContext<'_>,
) -> DiscardMode {
    if context.sender_blocked || context.group_blocked {
        return DiscardMode::Discard;
    }
    if !check_membership {
        return DiscardMode::Admit;
    }

    let (Some(local), Some(state)) = (context.local_service_id, context.group_state) else {
        return DiscardMode::Discard;
    };
    if &state.group_id != group_id {
        return DiscardMode::Discard;
    }

    let membership = &state.membership;
    if !membership.is_full_member(local) || !membership.is_full_member(sender) {
        return DiscardMode::Discard;
    }
    if state.announcements_only && !membership.is_full_member_and_administrator(sender) {
        return DiscardMode::DiscardVisibleContent;
    }
    DiscardMode::Admit
}
