//! # Inbox Runtime Library
//!
//! Exposes the runtime wiring for tests. The main entry point is the
//! `main.rs` binary.
//!
//! ## Wiring
//!
//! ```text
//! stdin (NDJSON) ──► InboxRuntime ──enqueue──► QueueSupervisor ──► GroupWorker(s)
//!                        │                          ▲                 │
//!                        │ wake signals             │ drain_all       ├─► LocalGroupStateOracle
//!                        ▼                          │                 ├─► LoggingSink
//!                   InMemoryEventBus ───────────────┘                 └─► KvJobStore
//! ```

pub mod adapters;
pub mod config;
pub mod runtime;

pub use adapters::{LocalGroupStateOracle, LoggingSink};
pub use config::{ConfigError, InboxConfig};
pub use runtime::{InboxRuntime, InputLine};
