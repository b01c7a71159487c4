//! Runner events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the runner, its signal
//! listeners and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Runner` (lifecycle transitions), signal listeners,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the run-scoped forwarder (fans out to `SubscriberSet`) and any
//!   receiver obtained from [`Runner::subscribe`](crate::Runner::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
