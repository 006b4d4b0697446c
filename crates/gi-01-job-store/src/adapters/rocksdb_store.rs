//! # RocksDB Job Storage
//!
//! Durable [`KeyValueStore`]. Writes are `WriteBatch`es synced to disk by
//! default, so an acknowledged enqueue survives a crash.
//!
//! | Setting | Default | Testing |
//! |---------|---------|---------|
//! | block cache | 8 MiB | 1 MiB |
//! | write buffer | 4 MiB | 1 MiB |
//! | fsync per write | yes | no |

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use rocksdb::{
    BlockBasedOptions, Cache, DBCompressionType, Direction, IteratorMode, Options, WriteBatch,
    WriteOptions, DB,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Database directory; created if missing.
    pub path: String,
    pub block_cache_size: usize,
    pub write_buffer_size: usize,
    /// fsync every batch.
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/group-inbox".to_string(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 1024 * 1024,
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

pub struct RocksDbStore {
    db: DB,
    sync_writes: bool,
}

fn io_error(what: &str, e: rocksdb::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: format!("RocksDB {what} failed: {e}"),
    }
}

impl RocksDbStore {
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut table = BlockBasedOptions::default();
        // Point lookups hit `idx:` and `cnt:` keys.
        table.set_bloom_filter(10.0, false);
        table.set_block_cache(&Cache::new_lru_cache(config.block_cache_size));

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(DBCompressionType::Snappy);
        opts.set_block_based_table_factory(&table);

        let db = DB::open(&opts, &config.path).map_err(|e| io_error("open", e))?;
        tracing::info!(path = %config.path, sync = config.sync_writes, "[gi-01] RocksDB opened");

        Ok(Self {
            db,
            sync_writes: config.sync_writes,
        })
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.db.get(key).map_err(|e| io_error("get", e))
    }

    fn write_batch(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put(key, value),
                BatchOperation::Delete { key } => batch.delete(key),
            }
        }
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);
        self.db
            .write_opt(batch, &write_opts)
            .map_err(|e| io_error("batch write", e))
    }

    fn scan_prefix(&self, prefix: &[u8], limit: Option<usize>) -> Result<ScanResult, KVStoreError> {
        let mut results = Vec::new();
        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            if limit.is_some_and(|limit| results.len() >= limit) {
                break;
            }
            let (key, value) = item.map_err(|e| io_error("scan", e))?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.into_vec(), value.into_vec()));
        }
        Ok(results)
    }

    fn blocks_on_io(&self) -> bool {
        true
    }
}
