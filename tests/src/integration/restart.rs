//! # Restart
//!
//! Jobs survive the process: a fresh supervisor over the same store picks
//! up where the previous one stopped.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use gi_01_job_store::{JobId, JobStore};
    use std::sync::Arc;

    async fn enqueue_and_stop(store: Arc<dyn JobStore>) -> Vec<JobId> {
        let harness = Harness::with_store(store);
        let g = group(1);
        let m = harness.member;
        let ids = harness
            .enqueue_suspended(vec![
                message(&g, m, 2, "one"),
                message(&g, m, 3, "two"),
                message(&g, m, 3, "three"),
            ])
            .await;
        harness.supervisor.shutdown();
        ids
    }

    async fn restart_and_drain(store: Arc<dyn JobStore>) -> Harness {
        let harness = Harness::with_store(store);
        harness.seed(&group(1), 2, 3);
        assert_eq!(harness.pending().await, 3);
        assert_eq!(harness.resume().await, 1);
        harness.settle().await;
        harness
    }

    #[tokio::test]
    async fn test_restart_delivers_everything() {
        let store = memory_store();
        let ids = enqueue_and_stop(Arc::clone(&store)).await;

        let harness = restart_and_drain(store).await;
        let delivered: Vec<JobId> = harness.sink.deliveries().iter().map(|d| d.job_id).collect();
        assert_eq!(delivered, ids);
        assert_eq!(batch_bodies(&harness.sink), vec![vec!["one"], vec!["two"], vec!["three"]]);
        assert_eq!(harness.pending().await, 0);
    }

    #[tokio::test]
    async fn test_ids_keep_growing_after_restart() {
        let store = memory_store();
        let ids = enqueue_and_stop(Arc::clone(&store)).await;

        let harness = restart_and_drain(Arc::clone(&store)).await;
        let next = harness
            .supervisor
            .enqueue(message(&group(1), harness.member, 3, "four"))
            .await
            .unwrap();
        harness.settle().await;

        assert!(ids.iter().all(|id| *id < next));
        assert_eq!(store.newest_job_id().await.unwrap(), Some(next));
    }

    #[cfg(feature = "rocksdb")]
    mod on_disk {
        use super::*;
        use gi_01_job_store::{KvJobStore, RocksDbConfig, RocksDbStore};

        fn open(dir: &tempfile::TempDir) -> Arc<dyn JobStore> {
            let kv = RocksDbStore::open(RocksDbConfig {
                path: dir.path().to_string_lossy().into_owned(),
                ..RocksDbConfig::default()
            })
            .unwrap();
            Arc::new(KvJobStore::open(kv).unwrap())
        }

        #[tokio::test]
        async fn test_restart_from_disk() {
            let dir = tempfile::tempdir().unwrap();
            let ids = enqueue_and_stop(open(&dir)).await;

            let harness = restart_and_drain(open(&dir)).await;
            let delivered: Vec<JobId> =
                harness.sink.deliveries().iter().map(|d| d.job_id).collect();
            assert_eq!(delivered, ids);
            assert_eq!(harness.pending().await, 0);
        }
    }
}
