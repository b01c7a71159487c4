//! # Event bus for broadcasting runner events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from the runner, its signal listeners and
//! subscriber workers.
//!
//! ## Architecture
//! ```text
//! Publishers:                        Consumers:
//!   Runner          ──┐
//!   Signal listener ──┼──► Bus ──┬──► run forwarder ────► SubscriberSet
//!   Subscriber work ──┘          └──► Runner::subscribe() receivers
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.
//! - **No runtime needed**: the channel can be created and published to outside a scheduler.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runner events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
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
    ///
    /// A receiver only gets events **sent after** it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn receiver_sees_only_later_events() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::RunStarting));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::SetupCompleted));

        assert_eq!(rx.try_recv().unwrap().kind, EventKind::SetupCompleted);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn lagging_receiver_skips_oldest() {
        let bus = Bus::new(1);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::RunStarting));
        bus.publish(Event::new(EventKind::RunStopped));

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(1))
        ));
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::RunStopped);
    }
}
