//! # Group Inbox Test Suite
//!
//! Cross-crate tests that run the real job store, discard filter and group
//! processor together against a scripted oracle and a recording sink.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Harness: store + mock oracle + recording sink
//! └── integration/
//!     ├── restart.rs    # No loss across restart
//!     ├── concurrency.rs# One worker per group under concurrent drains
//!     ├── ordering.rs   # Intra-group order and batch boundaries
//!     ├── catch_up.rs   # Embedded changes, caught-up groups, refused deltas
//!     ├── backoff.rs    # Retry timing and wake signals
//!     ├── discard.rs    # Block list, membership, announcements-only
//!     └── failures.rs   # Permanent failures, malformed jobs, flaky I/O
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gi-tests
//! cargo test -p gi-tests --features rocksdb   # adds on-disk restart tests
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod integration;
