//! # Discard Rules
//!
//! Blocked senders and groups, strangers and announcements-only groups,
//! checked against the group state after reconciliation.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use shared_types::{GroupMembership, GroupState, MemberRole, ServiceId};

    #[tokio::test]
    async fn test_announcements_only_group() {
        let harness = Harness::new();
        let g = group(1);
        let admin = ServiceId::random();
        let blocked = ServiceId::random();
        let stranger = ServiceId::random();
        harness.oracle.set_local(
            GroupState::new(
                g.clone(),
                5,
                GroupMembership::new()
                    .with_member(harness.local, MemberRole::Default)
                    .with_member(harness.member, MemberRole::Default)
                    .with_member(blocked, MemberRole::Default)
                    .with_member(admin, MemberRole::Administrator),
            )
            .announcements_only(true),
        );
        harness.block_list.block_sender(blocked);

        harness
            .enqueue_suspended(vec![
                message(&g, blocked, 5, "blocked"),
                message(&g, harness.member, 5, "member"),
                message(&g, admin, 5, "admin"),
                message(&g, stranger, 5, "stranger"),
            ])
            .await;
        harness.resume().await;
        harness.settle().await;

        let delivered: Vec<(String, bool)> = harness
            .sink
            .deliveries()
            .into_iter()
            .zip(batch_bodies(&harness.sink).into_iter().flatten())
            .map(|(d, body)| (body, d.discard_visible_content))
            .collect();
        assert_eq!(
            delivered,
            vec![("member".to_string(), true), ("admin".to_string(), false)]
        );
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test]
    async fn test_blocked_group_skips_reconciliation() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 1, 9);
        harness.block_list.block_group(g.clone());

        harness
            .supervisor
            .enqueue(message(&g, harness.member, 9, "muted"))
            .await
            .unwrap();
        harness.settle().await;

        assert!(harness.oracle.refresh_calls().is_empty());
        assert!(harness.sink.deliveries().is_empty());
        assert!(harness.queued(&g).await.is_empty());
    }

    #[tokio::test]
    async fn test_invited_sender_not_admitted() {
        let harness = Harness::new();
        let g = group(1);
        let invitee = ServiceId::random();
        harness.oracle.set_local(GroupState::new(
            g.clone(),
            2,
            GroupMembership::new()
                .with_member(harness.local, MemberRole::Default)
                .with_invited(invitee),
        ));

        harness
            .supervisor
            .enqueue(message(&g, invitee, 2, "too early"))
            .await
            .unwrap();
        harness.settle().await;

        assert!(harness.sink.deliveries().is_empty());
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test]
    async fn test_local_user_removed_from_group() {
        let harness = Harness::new();
        let g = group(1);
        harness.oracle.set_local(GroupState::new(
            g.clone(),
            3,
            GroupMembership::new().with_member(harness.member, MemberRole::Default),
        ));

        harness
            .supervisor
            .enqueue(message(&g, harness.member, 3, "after removal"))
            .await
            .unwrap();
        harness.settle().await;

        assert!(harness.sink.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_unblock_admits_later_messages() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 4, 4);
        harness.block_list.block_sender(harness.member);

        harness
            .supervisor
            .enqueue(message(&g, harness.member, 4, "first"))
            .await
            .unwrap();
        harness.settle().await;

        harness.block_list.unblock_sender(&harness.member);
        harness
            .supervisor
            .enqueue(message(&g, harness.member, 4, "second"))
            .await
            .unwrap();
        harness.settle().await;

        assert_eq!(batch_bodies(&harness.sink), vec![vec!["second"]]);
    }
}
