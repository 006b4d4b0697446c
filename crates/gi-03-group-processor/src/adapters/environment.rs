//! # Shared Environment
//!
//! Process-wide gates backed by atomics. Every transition that can unblock
//! the queue also publishes a wake signal when a bus is attached.

use crate::ports::ProcessingEnvironment;
use parking_lot::RwLock;
use shared_bus::{InMemoryEventBus, InboxEvent, WakeSignal};
use shared_types::ServiceId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Registration, suspension and foreground state.
#[derive(Default)]
pub struct SharedEnvironment {
    local_service_id: RwLock<Option<ServiceId>>,
    suspended: AtomicBool,
    background: AtomicBool,
    bus: Option<Arc<InMemoryEventBus>>,
}

impl SharedEnvironment {
    /// Unregistered, foreground, not suspended.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered as `local` and ready to process.
    pub fn registered(local: ServiceId) -> Self {
        Self {
            local_service_id: RwLock::new(Some(local)),
            ..Self::default()
        }
    }

    /// Publish wake signals on `bus` for every transition.
    pub fn with_bus(mut self, bus: Arc<InMemoryEventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Set or clear the local account.
    pub fn set_registration(&self, local: Option<ServiceId>) {
        *self.local_service_id.write() = local;
        self.wake(WakeSignal::RegistrationChanged);
    }

    /// Pause or resume processing. Workers stop at their next batch
    /// boundary while suspended.
    pub fn set_suspended(&self, suspended: bool) {
        let was = self.suspended.swap(suspended, Ordering::SeqCst);
        if was && !suspended {
            self.wake(WakeSignal::ProcessingResumed);
        }
    }

    pub fn set_background(&self, background: bool) {
        let was = self.background.swap(background, Ordering::SeqCst);
        if was != background {
            self.wake(if background {
                WakeSignal::Background
            } else {
                WakeSignal::Foreground
            });
        }
    }

    fn wake(&self, signal: WakeSignal) {
        if let Some(bus) = &self.bus {
            let receivers = bus.emit(InboxEvent::Wake(signal));
            debug!(signal = ?signal, receivers, "[gi-03] Environment wake");
        }
    }
}

impl ProcessingEnvironment for SharedEnvironment {
    fn is_processing_permitted(&self) -> bool {
        self.is_registered() && !self.suspended.load(Ordering::SeqCst)
    }

    fn is_registered(&self) -> bool {
        self.local_service_id.read().is_some()
    }

    fn is_in_background(&self) -> bool {
        self.background.load(Ordering::SeqCst)
    }

    fn local_service_id(&self) -> Option<ServiceId> {
        *self.local_service_id.read()
    }
}
