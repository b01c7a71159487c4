//! # Lifecycle events emitted by the runner.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: run flow (starting, setup done, stop requested, teardown done, stopped)
//! - **Signal events**: OS signal translation (received, handler failed)
//! - **Subscriber events**: delivery problems (overflow, panic)
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! signal involved, reasons, and the subscriber name.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use runlet::{Event, EventKind, ShutdownSignal};
//!
//! let ev = Event::new(EventKind::SignalReceived).with_signal(ShutdownSignal::Interrupt);
//!
//! assert_eq!(ev.kind, EventKind::SignalReceived);
//! assert_eq!(ev.signal, Some(ShutdownSignal::Interrupt));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::ShutdownSignal;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runner events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// `run()` accepted the call and the runner is now `Running`.
    RunStarting,

    /// The context task reached its suspension point (setup finished).
    SetupCompleted,

    /// A stop was accepted; the wait in `run()` is about to resume.
    StopRequested,

    /// The context task terminated after its second advance (teardown finished).
    TeardownCompleted,

    /// `run()` finished successfully; the runner is `Stopped`.
    RunStopped,

    /// `run()` finished with an error; the runner is `Stopped`.
    ///
    /// Sets:
    /// - `reason`: rendered error
    RunFailed,

    // === Signal events ===
    /// A registered OS signal was delivered to the runner.
    ///
    /// Sets:
    /// - `signal`: the signal
    SignalReceived,

    /// Translating a signal into a stop request failed (e.g. a second signal).
    ///
    /// Sets:
    /// - `signal`: the signal
    /// - `reason`: the rejected stop's error
    SignalHandlerFailed,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Runner event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Signal involved, for signal events.
    pub signal: Option<ShutdownSignal>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Name of the subscriber, for subscriber events.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            signal: None,
            reason: None,
            subscriber: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the signal involved.
    #[inline]
    pub fn with_signal(mut self, signal: ShutdownSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// True for `SubscriberOverflow`; such events are never re-published on overflow.
    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// True for `RunStopped` and `RunFailed`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::RunStopped | EventKind::RunFailed)
    }
}
