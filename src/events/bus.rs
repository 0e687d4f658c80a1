//! # Event bus for broadcasting engine events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from the registry, scheduler and loaders.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Subscriber (one):
//!   Registry  ──┐
//!   Scheduler ──┼──────► Bus ───────► subscriber_listener ────► SubscriberSet
//!   Scripts   ──┤  (broadcast chan)     (spawned by builder)
//!   Remote    ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and needs no runtime.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for engine events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn publish_without_receivers_is_silent() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ModuleDefined));
    }

    #[test]
    fn receiver_sees_events_sent_after_subscribe() {
        let bus = Bus::new(4);
        bus.publish(Event::new(EventKind::ModuleDefined).with_module("early"));
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ModuleResolved).with_module("late"));

        let ev = rx.try_recv().expect("event");
        assert_eq!(ev.kind, EventKind::ModuleResolved);
        assert_eq!(ev.module.as_deref(), Some("late"));
        assert!(rx.try_recv().is_err());
    }
}
