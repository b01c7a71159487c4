//! # Event subscribers for the runner.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] that
//! fans runner [`Event`](crate::Event)s out to user subscribers.
//!
//! ## Architecture
//! ```text
//! Runner ── publish(Event) ──► Bus ──► run forwarder ──► SubscriberSet::emit(&Event)
//!                                                     ┌─────────┼─────────┐
//!                                                     ▼         ▼         ▼
//!                                                 [queue S1] [queue S2] [queue SN]
//!                                                     │         │         │
//!                                                 on_event  on_event  on_event
//! ```
//!
//! Subscriber workers live on the runner's scheduler for the duration of one
//! `run()`; their queues are drained before `run()` returns.

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
