//! # Ordering
//!
//! Jobs of a group reach the sink in arrival order. A job that needs a
//! refresh ends the batch before it and is handled alone.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use gi_01_job_store::JobId;
    use proptest::prelude::*;
    use shared_types::Revision;

    #[tokio::test]
    async fn test_refresh_job_splits_batches() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 5, 7);
        let m = harness.member;

        harness
            .enqueue_suspended(vec![
                message(&g, m, 5, "m1"),
                message(&g, m, 5, "m2"),
                message(&g, m, 7, "m3"),
                message(&g, m, 7, "m4"),
            ])
            .await;
        harness.resume().await;
        harness.settle().await;

        assert_eq!(
            batch_bodies(&harness.sink),
            vec![vec!["m1", "m2"], vec!["m3"], vec!["m4"]]
        );
        assert_eq!(harness.oracle.refresh_calls(), vec![(g.clone(), 7)]);
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test]
    async fn test_one_refresh_covers_later_jobs() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 4, 7);
        let m = harness.member;

        harness
            .enqueue_suspended(vec![
                message(&g, m, 5, "a"),
                message(&g, m, 5, "b"),
                message(&g, m, 7, "c"),
            ])
            .await;
        harness.resume().await;
        harness.settle().await;

        // Remote state is already at 7, so the first refresh covers all.
        assert_eq!(harness.oracle.refresh_calls(), vec![(g.clone(), 5)]);
        assert_eq!(batch_bodies(&harness.sink), vec![vec!["a"], vec!["b", "c"]]);
        assert!(harness.queued(&g).await.is_empty());
    }

    #[tokio::test]
    async fn test_groups_do_not_share_order() {
        let harness = Harness::new();
        let (g1, g2) = (group(1), group(2));
        harness.seed(&g1, 3, 3);
        harness.seed(&g2, 3, 3);
        let m = harness.member;

        harness
            .enqueue_suspended(vec![
                message(&g1, m, 3, "g1-a"),
                message(&g2, m, 3, "g2-a"),
                message(&g1, m, 3, "g1-b"),
                message(&g2, m, 3, "g2-b"),
            ])
            .await;
        assert_eq!(harness.resume().await, 2);
        harness.settle().await;

        for (g, expected) in [(&g1, ["g1-a", "g1-b"]), (&g2, ["g2-a", "g2-b"])] {
            let bodies: Vec<String> = batch_bodies(&harness.sink)
                .into_iter()
                .flatten()
                .filter(|body| body.starts_with(if g == &g1 { "g1" } else { "g2" }))
                .collect();
            assert_eq!(bodies, expected);
        }
    }

    #[tokio::test]
    async fn test_background_delivers_one_job_per_batch() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 2, 2);
        let m = harness.member;

        harness
            .enqueue_suspended(vec![
                message(&g, m, 1, "x"),
                message(&g, m, 2, "y"),
                message(&g, m, 2, "z"),
            ])
            .await;
        harness.env.set_background(true);
        harness.resume().await;
        harness.settle().await;

        assert_eq!(batch_bodies(&harness.sink), vec![vec!["x"], vec!["y"], vec!["z"]]);
    }

    /// Expected refresh count: one per job whose revision exceeds every
    /// revision seen before it.
    fn expected_refreshes(local: Revision, revisions: &[Revision]) -> usize {
        let mut high = local;
        revisions
            .iter()
            .filter(|&&rev| {
                let newer = rev > high;
                high = high.max(rev);
                newer
            })
            .count()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_every_job_delivered_once_in_order(
            revisions in proptest::collection::vec(1u32..8, 1..24)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let harness = Harness::new();
                let g = group(9);
                // No remote state: each refresh lands exactly on its target.
                harness.oracle.set_local(harness.state(&g, 3));

                let messages = revisions
                    .iter()
                    .enumerate()
                    .map(|(i, rev)| message(&g, harness.member, *rev, &i.to_string()))
                    .collect();
                let ids = harness.enqueue_suspended(messages).await;
                harness.resume().await;
                harness.settle().await;

                let delivered: Vec<JobId> =
                    harness.sink.deliveries().iter().map(|d| d.job_id).collect();
                prop_assert_eq!(delivered, ids);
                prop_assert_eq!(
                    harness.oracle.refresh_calls().len(),
                    expected_refreshes(3, &revisions)
                );
                prop_assert_eq!(harness.pending().await, 0);
                Ok(())
            })?;
        }
    }
}
