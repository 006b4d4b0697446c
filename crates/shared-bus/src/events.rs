//! # Inbox Events
//!
//! Everything that flows through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::GroupId;

/// Reasons the queue might now be able to make progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WakeSignal {
    /// App moved to the foreground.
    Foreground,
    /// App moved to the background.
    Background,
    /// Local registration state changed.
    RegistrationChanged,
    /// Socket or push connection state changed.
    ConnectionChanged,
    /// Network reachability changed.
    ReachabilityChanged,
    /// Message processing was resumed after a suspension.
    ProcessingResumed,
    /// Explicit request (operator, tests).
    Manual,
}

/// All events that can be published to the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboxEvent {
    /// Something changed that may unblock pending jobs.
    Wake(WakeSignal),

    /// A job was durably stored.
    JobEnqueued {
        /// Group the job belongs to.
        group_id: GroupId,
        /// Store-assigned job id.
        job_id: u64,
    },

    /// A per-group worker released its handle.
    WorkerFinished {
        /// Group the worker served.
        group_id: GroupId,
    },

    /// The job store reported no pending groups.
    QueueFlushed,
}

impl InboxEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Wake(_) => EventTopic::Wake,
            Self::JobEnqueued { .. } | Self::WorkerFinished { .. } | Self::QueueFlushed => {
                EventTopic::Queue
            }
        }
    }

    /// True for [`InboxEvent::Wake`].
    #[must_use]
    pub fn is_wake(&self) -> bool {
        matches!(self, Self::Wake(_))
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Wake signals.
    Wake,
    /// Queue lifecycle notifications.
    Queue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Wake signals only.
    #[must_use]
    pub fn wake() -> Self {
        Self::topics(vec![EventTopic::Wake])
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &InboxEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
