use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Outcomes of the hibernation state machine, reported once each as they happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum HibernationEvent {
    HibernationScheduled,
    /// The bridge went away before the attempt could commit.
    HibernationAbortedDueToPendingDestruction,
    HibernationAbortedDueToVisibilityChange,
    HibernationAbortedDueGpuContextLoss,
    /// The attempt found no accelerated surface to give up.
    HibernationAbortedBecauseNoSurface,
    DidStartHibernating,
    HibernationEndedNormally,
    HibernationEndedWithSwitchToBackgroundRendering,
    HibernationEndedWithTeardown,
}

/// Why a bridge dropped to unaccelerated rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    ContextLost,
    AllocationFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    Hibernation { kind: HibernationEvent },
    FellBackToUnaccelerated { reason: FallbackReason },
    /// Neither an accelerated nor an unaccelerated surface could be allocated.
    SurfaceCreationFailed,
    AccelerationRestored,
    /// A consumer reported a handed-off resource as lost.
    HandoffResourceLost,
}

impl From<HibernationEvent> for BridgeEvent {
    fn from(kind: HibernationEvent) -> Self {
        Self::Hibernation { kind }
    }
}

/// Receives bridge events. Called on the bridge's owning thread with the bridge locked, so an
/// observer must not call back into the bridge.
pub trait BridgeObserver: Send + Sync {
    fn on_event(&self, event: BridgeEvent);
}

/// Deliver an event to an observer that may already be gone.
pub(crate) fn notify(observer: Option<&Weak<dyn BridgeObserver>>, event: BridgeEvent) {
    if let Some(observer) = observer.and_then(Weak::upgrade) {
        observer.on_event(event);
    }
}

/// Observer that records every event in order.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<BridgeEvent>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().clone()
    }

    pub fn hibernation_events(&self) -> Vec<HibernationEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                BridgeEvent::Hibernation { kind } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, event: BridgeEvent) -> usize {
        self.events.lock().iter().filter(|e| **e == event).count()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<BridgeEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// A weak observer handle for [`crate::BridgeDeps`].
    pub fn observer(self: &Arc<Self>) -> Weak<dyn BridgeObserver> {
        let weak: Weak<Self> = Arc::downgrade(self);
        weak
    }
}

impl BridgeObserver for EventLog {
    fn on_event(&self, event: BridgeEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bridge/events.rs"]
mod tests;
