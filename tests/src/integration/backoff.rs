//! # Retry Timing
//!
//! Runs on a paused clock so gaps between refresh attempts are exact.
//! Test config: initial delay 10ms, ceiling 80ms. Every scheduled retry
//! doubles the next delay, whether or not a wake ends the wait early.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use gi_03_group_processor::{MockGroupStateOracle, OracleCall, OracleError};
    use shared_bus::{InboxEvent, WakeSignal};
    use std::time::Duration;

    fn gaps(harness: &Harness) -> Vec<u64> {
        harness
            .oracle
            .refresh_instants()
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis() as u64)
            .collect()
    }

    fn wake_after(harness: &Harness, after: Duration) {
        let bus = harness.bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            bus.emit(InboxEvent::Wake(WakeSignal::Manual));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_double_up_to_ceiling() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 5, 6);
        for _ in 0..5 {
            harness.oracle.fail_next(OracleCall::Refresh, OracleError::Timeout);
        }

        harness
            .supervisor
            .enqueue(message(&g, harness.member, 6, "stubborn"))
            .await
            .unwrap();
        harness.settle().await;

        assert_eq!(gaps(&harness), vec![10, 20, 40, 80, 80]);
        assert_eq!(harness.sink.deliveries().len(), 1);
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_during_batch_retries_at_once_and_grows_delay() {
        let harness = Harness::with_oracle(MockGroupStateOracle::with_latency(
            Duration::from_millis(10),
        ));
        let g = group(1);
        harness.seed(&g, 5, 6);
        harness.oracle.fail_next(OracleCall::Refresh, OracleError::Timeout);
        harness.oracle.fail_next(OracleCall::Refresh, OracleError::Timeout);

        wake_after(&harness, Duration::from_millis(5));
        harness
            .supervisor
            .enqueue(message(&g, harness.member, 6, "woken"))
            .await
            .unwrap();
        harness.settle().await;

        // First retry skips its 10ms wait; the second still waits 20ms on
        // top of the 10ms call.
        assert_eq!(gaps(&harness), vec![10, 30]);
        assert_eq!(harness.sink.deliveries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_during_wait_still_grows_delay() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 5, 6);
        harness.oracle.fail_next(OracleCall::Refresh, OracleError::Timeout);
        harness.oracle.fail_next(OracleCall::Refresh, OracleError::Timeout);

        wake_after(&harness, Duration::from_millis(5));
        harness
            .supervisor
            .enqueue(message(&g, harness.member, 6, "early"))
            .await
            .unwrap();
        harness.settle().await;

        // Cut short at 5ms; the next wait is already doubled.
        assert_eq!(gaps(&harness), vec![5, 20]);
        assert_eq!(harness.sink.deliveries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flapping_wakes_do_not_pin_delay() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 5, 6);
        for _ in 0..5 {
            harness.oracle.fail_next(OracleCall::Refresh, OracleError::Timeout);
        }

        let bus = harness.bus.clone();
        tokio::spawn(async move {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_millis(7)).await;
                bus.emit(InboxEvent::Wake(WakeSignal::ConnectionChanged));
            }
        });
        harness
            .supervisor
            .enqueue(message(&g, harness.member, 6, "flapping"))
            .await
            .unwrap();
        harness.settle().await;

        // Three wakes race the timer; once they stop the wait has already
        // reached the ceiling.
        assert_eq!(gaps(&harness), vec![7, 7, 7, 80, 80]);
        assert_eq!(harness.sink.deliveries().len(), 1);
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_counted_on_job() {
        let harness = Harness::new();
        let g = group(1);
        harness.seed(&g, 5, 6);
        for _ in 0..3 {
            harness.oracle.fail_next(OracleCall::Refresh, OracleError::Network("reset".into()));
        }
        harness.env.set_suspended(true);
        harness
            .supervisor
            .enqueue(message(&g, harness.member, 6, "counted"))
            .await
            .unwrap();

        harness.env.set_suspended(false);
        harness.supervisor.drain_all().await.unwrap();
        // Attempts at 0, 10 and 30ms; the next one would be at 70ms.
        tokio::time::sleep(Duration::from_millis(35)).await;
        harness.env.set_suspended(true);
        harness.settle().await;

        let queued = harness.queued(&g).await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].failure_count, 3);
    }
}
