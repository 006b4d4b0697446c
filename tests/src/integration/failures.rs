//! # Failure Handling
//!
//! Permanent refresh failures, malformed jobs and flaky collaborators.
//! Every case ends with an empty queue or a job kept for a later attempt,
//! never with a lost delivery.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use gi_03_group_processor::{MockGroupStateOracle, OracleCall, OracleError, ProcessorConfig};
    use shared_bus::{EventFilter, InboxEvent};
    use shared_types::{EnvelopeMeta, IncomingGroupMessage};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_permanent_failure_covers_queued_jobs() {
        let harness = Harness::new();
        let g = group(1);
        harness.oracle.set_local(harness.state(&g, 5));
        harness.oracle.fail_next(OracleCall::Refresh, OracleError::NotAMember);
        let m = harness.member;

        harness
            .enqueue_suspended(vec![
                message(&g, m, 7, "a"),
                message(&g, m, 8, "b"),
                message(&g, m, 9, "c"),
            ])
            .await;
        harness.resume().await;
        harness.settle().await;

        assert_eq!(harness.oracle.refresh_calls(), vec![(g.clone(), 7)]);
        assert!(harness.sink.deliveries().is_empty());
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test]
    async fn test_job_added_during_failing_refresh_gets_own_attempt() {
        let harness = Harness::with_oracle(MockGroupStateOracle::with_latency(
            Duration::from_millis(50),
        ));
        let g = group(1);
        harness.seed(&g, 5, 6);
        harness.oracle.fail_next(OracleCall::Refresh, OracleError::NotAMember);

        harness
            .supervisor
            .enqueue(message(&g, harness.member, 6, "early"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        harness
            .supervisor
            .enqueue(message(&g, harness.member, 6, "late"))
            .await
            .unwrap();
        harness.settle().await;

        assert_eq!(harness.oracle.refresh_calls().len(), 2);
        assert_eq!(batch_bodies(&harness.sink), vec![vec!["late"]]);
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test]
    async fn test_malformed_jobs_dropped_without_network() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 3, 3);

        let undecodable = IncomingGroupMessage {
            plaintext: vec![7, 7, 7],
            ..message(&g, harness.member, 3, "")
        };
        let anonymous = IncomingGroupMessage {
            envelope: EnvelopeMeta {
                sender: None,
                ..EnvelopeMeta::from_sender(harness.member)
            },
            ..message(&g, harness.member, 3, "nobody")
        };
        harness
            .enqueue_suspended(vec![
                undecodable,
                anonymous,
                message(&g, harness.member, 3, "fine"),
            ])
            .await;
        harness.resume().await;
        harness.settle().await;

        assert_eq!(batch_bodies(&harness.sink), vec![vec!["fine"]]);
        assert!(harness.oracle.refresh_calls().is_empty());
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test]
    async fn test_sink_failure_retried() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 2, 2);
        harness.sink.fail_next(1);

        harness
            .supervisor
            .enqueue(message(&g, harness.member, 2, "retry me"))
            .await
            .unwrap();
        harness.settle().await;

        assert_eq!(batch_bodies(&harness.sink), vec![vec!["retry me"]]);
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test]
    async fn test_failed_remove_redelivers() {
        let store = Arc::new(FlakyStore::new(memory_store(), 1));
        let harness = Harness::with_parts(
            ProcessorConfig::for_testing(),
            store,
            Arc::new(MockGroupStateOracle::new()),
        );
        let g = group(1);
        harness.seed(&g, 2, 2);

        let id = harness
            .supervisor
            .enqueue(message(&g, harness.member, 2, "twice"))
            .await
            .unwrap();
        harness.settle().await;

        // Delivered before removal, so the retry delivers again.
        let delivered: Vec<_> = harness.sink.deliveries().iter().map(|d| d.job_id).collect();
        assert_eq!(delivered, vec![id, id]);
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test]
    async fn test_unregistered_waits_for_registration() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 2, 2);
        let listener = harness
            .supervisor
            .spawn_signal_listener(harness.bus.subscribe(EventFilter::wake()));
        let mut queue_events = harness.bus.subscribe(EventFilter::all());

        harness.env.set_registration(None);
        harness
            .supervisor
            .enqueue(message(&g, harness.member, 2, "held"))
            .await
            .unwrap();
        assert!(!harness.supervisor.is_actively_processing());
        assert_eq!(harness.pending().await, 1);

        harness.env.set_registration(Some(harness.local));
        tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(event) = queue_events.recv().await {
                if matches!(event, InboxEvent::QueueFlushed) {
                    break;
                }
            }
        })
        .await
        .expect("queue never flushed");

        assert_eq!(batch_bodies(&harness.sink), vec![vec!["held"]]);
        harness.supervisor.shutdown();
        listener.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_keeps_jobs_for_next_run() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 2, 2);

        harness
            .enqueue_suspended(vec![message(&g, harness.member, 2, "later")])
            .await;
        harness.supervisor.shutdown();
        harness.env.set_suspended(false);

        assert_eq!(harness.supervisor.drain_all().await.unwrap(), 0);
        assert!(harness
            .supervisor
            .enqueue(message(&g, harness.member, 2, "refused"))
            .await
            .is_err());
        assert_eq!(harness.pending().await, 1);
    }
}
