//! # Shared Bus - Wake Signals and Queue Notifications
//!
//! The group inbox is level-triggered: anything that might let stuck work
//! make progress publishes a [`WakeSignal`], and the queue supervisor reacts
//! by re-draining every group with pending jobs.
//!
//! ```text
//! ┌──────────────┐   Wake(signal)    ┌──────────────┐   drain_all()   ┌─────────┐
//! │  Lifecycle / │ ────────────────▶ │  Event Bus   │ ──────────────▶ │ Queue   │
//! │  Connectivity│                   │              │ ◀────────────── │ Super-  │
//! └──────────────┘                   └──────────────┘  QueueFlushed,  │ visor   │
//!                                                      WorkerFinished └─────────┘
//! ```
//!
//! Workers also listen: a wake signal observed during a batch makes the
//! next retry immediate, and one observed during a backoff wait cuts the
//! wait short.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, InboxEvent, WakeSignal};
pub use publisher::{BusStats, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before older ones are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
