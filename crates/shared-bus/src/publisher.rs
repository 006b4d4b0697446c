//! # Event Bus
//!
//! A `tokio::sync::broadcast` channel behind a small API. Emitting never
//! blocks and never fails, so producers can call it from synchronous code
//! (environment setters, lock-free release paths).

use crate::events::{EventFilter, EventTopic, InboxEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Counters of emitted events, by topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Wake signals emitted.
    pub wakes: u64,
    /// Queue notifications emitted.
    pub queue_events: u64,
    /// Events emitted while nobody was subscribed.
    pub unobserved: u64,
}

/// In-process event bus.
///
/// Subscribers that fall more than `capacity` events behind lose the
/// oldest ones. Wake signals are level-triggered, so a lost one only
/// delays a drain that the next signal performs anyway.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<InboxEvent>,
    capacity: usize,
    wakes: AtomicU64,
    queue_events: AtomicU64,
    unobserved: AtomicU64,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus buffering at most `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            capacity,
            wakes: AtomicU64::new(0),
            queue_events: AtomicU64::new(0),
            unobserved: AtomicU64::new(0),
        }
    }

    /// Subscribe to events matching `filter`.
    ///
    /// Only events emitted after this call are observed.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, "[bus] Subscribed");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Same as [`subscribe`](Self::subscribe), as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Emit `event`. Returns how many subscribers it reached.
    pub fn emit(&self, event: InboxEvent) -> usize {
        let topic = event.topic();
        match topic {
            EventTopic::Wake => self.wakes.fetch_add(1, Ordering::Relaxed),
            _ => self.queue_events.fetch_add(1, Ordering::Relaxed),
        };

        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(topic = ?topic, receivers, "[bus] Event emitted");
                receivers
            }
            Err(_) => {
                self.unobserved.fetch_add(1, Ordering::Relaxed);
                trace!(topic = ?topic, "[bus] Event emitted with no subscribers");
                0
            }
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn stats(&self) -> BusStats {
        BusStats {
            wakes: self.wakes.load(Ordering::Relaxed),
            queue_events: self.queue_events.load(Ordering::Relaxed),
            unobserved: self.unobserved.load(Ordering::Relaxed),
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}
