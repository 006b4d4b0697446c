//! # Group Message Job Store (gi-01)
//!
//! Durable, per-group FIFO of decrypted group messages that are waiting for
//! the local group state to catch up with the revision they assert.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Monotonic Ids | Job ids strictly increase and are never reused, across restarts |
//! | 2 | Group FIFO | `next_jobs` returns a group's jobs oldest-first |
//! | 3 | Atomic Mutation | Every write is a single `write_batch` |
//! | 4 | Idempotent Removal | Removing an unknown id is a no-op |
//!
//! ## Key Layout
//!
//! ```text
//! job:<hex group>:<id BE>   -> bincode(QueuedMessage)
//! idx:<id BE>               -> group id bytes
//! cnt:<hex group>           -> u64 BE pending count
//! meta:next_job_id          -> u64 BE
//! ```
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Job records, key encoding, errors
//! - `ports/` - `JobStore` (inbound API), `KeyValueStore` (outbound SPI)
//! - `adapters/` - `InMemoryKVStore`, `RocksDbStore` (feature `rocksdb`)
//! - `service.rs` - `KvJobStore`, the `JobStore` implementation over any KV store

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use domain::entities::{JobId, NewJob, QueuedMessage};
pub use domain::errors::{JobStoreError, KVStoreError};
pub use ports::inbound::JobStore;
pub use ports::outbound::{BatchOperation, KeyValueStore, SystemTimeSource, TimeSource};
pub use service::KvJobStore;
