//! # Outbound Ports
//!
//! What the job store needs from its environment: an ordered byte-keyed
//! store with atomic multi-key writes, and a wall clock.

use crate::domain::errors::KVStoreError;

/// `(key, value)` pairs in ascending key order.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Ordered key-value storage.
///
/// Every mutation goes through [`write_batch`](Self::write_batch) so a job
/// record, its id index and its group counter always change together.
///
/// Production: `RocksDbStore` (feature `rocksdb`). Testing: `InMemoryKVStore`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Apply all `operations` or none of them.
    fn write_batch(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;

    /// Pairs whose key starts with `prefix`, ascending, at most `limit`.
    fn scan_prefix(&self, prefix: &[u8], limit: Option<usize>) -> Result<ScanResult, KVStoreError>;

    /// Whether calls may block the thread on disk I/O. Such stores are
    /// driven from the blocking thread pool.
    fn blocks_on_io(&self) -> bool {
        false
    }
}

/// One mutation inside a [`KeyValueStore::write_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self::Delete { key: key.into() }
    }
}

/// Source of enqueue timestamps.
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}
