//! # Concurrency
//!
//! At most one worker per group, however many callers drain or enqueue at
//! the same time.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use gi_01_job_store::JobId;
    use gi_03_group_processor::{MockGroupStateOracle, ProcessorConfig};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn slow_harness() -> Harness {
        Harness::with_parts(
            ProcessorConfig::for_testing(),
            memory_store(),
            Arc::new(MockGroupStateOracle::with_latency(Duration::from_millis(20))),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_drains_start_one_worker_per_group() {
        let harness = slow_harness();
        let groups: Vec<_> = (1..=4).map(group).collect();
        let mut messages = Vec::new();
        for g in &groups {
            harness.oracle.set_local(harness.state(g, 1));
            for rev in 2..=4 {
                messages.push(message(g, harness.member, rev, "x"));
            }
        }
        harness.enqueue_suspended(messages).await;
        harness.env.set_suspended(false);

        let drains: Vec<_> = (0..8)
            .map(|_| {
                let supervisor = harness.supervisor.clone();
                tokio::spawn(async move { supervisor.drain_all().await.unwrap() })
            })
            .collect();
        let mut started = 0;
        for drain in drains {
            started += drain.await.unwrap();
        }

        assert_eq!(started, groups.len());
        assert!(harness.supervisor.worker_handles().len() <= groups.len());
        harness.settle().await;
        assert_eq!(harness.sink.deliveries().len(), 12);
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_group_never_overlaps_oracle_calls() {
        let harness = slow_harness();
        let g = group(1);
        harness.oracle.set_local(harness.state(&g, 1));

        let messages = (2..=6)
            .map(|rev| message(&g, harness.member, rev, "step"))
            .collect();
        harness.enqueue_suspended(messages).await;
        harness.env.set_suspended(false);

        let drains: Vec<_> = (0..8)
            .map(|_| {
                let supervisor = harness.supervisor.clone();
                tokio::spawn(async move { supervisor.drain_all().await.unwrap() })
            })
            .collect();
        for drain in drains {
            drain.await.unwrap();
        }
        harness.settle().await;

        assert_eq!(harness.oracle.refresh_calls().len(), 5);
        assert_eq!(harness.oracle.max_in_flight(), 1);
        assert_eq!(harness.sink.deliveries().len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueues_deliver_exactly_once() {
        let harness = slow_harness();
        let g = group(1);
        harness.seed(&g, 1, 1);

        let enqueues: Vec<_> = (0..32)
            .map(|i| {
                let supervisor = harness.supervisor.clone();
                let msg = message(&g, harness.member, 1 + i % 3, "burst");
                tokio::spawn(async move { supervisor.enqueue(msg).await.unwrap() })
            })
            .collect();
        let mut ids = HashSet::new();
        for enqueue in enqueues {
            ids.insert(enqueue.await.unwrap());
        }
        harness.settle().await;

        let delivered: Vec<JobId> = harness.sink.deliveries().iter().map(|d| d.job_id).collect();
        let unique: HashSet<JobId> = delivered.iter().copied().collect();
        assert_eq!(delivered.len(), 32);
        assert_eq!(unique, ids);
        assert!(harness.oracle.max_in_flight() <= 1);
        assert_eq!(harness.pending().await, 0);

        let mut sorted = delivered.clone();
        sorted.sort();
        assert_eq!(delivered, sorted, "a group delivers in enqueue order");
    }
}
