//! # runlet
//!
//! **runlet** runs one long-lived cooperative task with an explicit setup and
//! teardown phase, and shuts it down gracefully on an explicit stop request or
//! on an OS termination signal.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Runner::new(context)                   caller thread
//!          │
//!          ▼ run()
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  current-thread scheduler (owned by this run)                     │
//! │                                                                   │
//! │   context(runner, args) ──► SuspendableTask                       │
//! │          │                                                        │
//! │          ├─► advance()  setup ──────────► Step::Suspended         │
//! │          │                                                        │
//! │          │   wait on stop token ◄── Runner::stop()                │
//! │          │                      ◄── signal listener (SIGINT/TERM) │
//! │          │                      ◄── timers / spawned tasks        │
//! │          │                                                        │
//! │          └─► advance()  teardown ───────► Step::Terminated        │
//! │                                                                   │
//! │   Bus ──► SubscriberSet ──► Subscribe::on_event (per subscriber)  │
//! └───────────────────────────────────────────────────────────────────┘
//!          │
//!          ▼ Ok(()) / RunError
//! ```
//!
//! ### Lifecycle
//! ```text
//! NotStarted ──run()──► Running ──stop()/signal──► (Running) ──teardown──► Stopped
//!
//! run()  while Running/Stopped      ─► LifecycleError::AlreadyStarted
//! stop() while NotStarted           ─► LifecycleError::NotStarted
//! stop() after an accepted stop     ─► LifecycleError::AlreadyStopped
//! task never suspends               ─► ShapeError::NotSuspendable
//! task suspends again on teardown   ─► ShapeError::MultipleYield
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                       |
//! |-------------------|---------------------------------------------------------------|------------------------------------------|
//! | **Runner**        | Run one two-phase task until stopped or signalled.            | [`Runner`], [`RunnerBuilder`], [`State`] |
//! | **Tasks**         | Write the task as an `async` block or implement it by hand.   | [`Coroutine`], [`SuspendableTask`]       |
//! | **Signals**       | Translate OS signals into a cooperative stop.                 | [`ShutdownSignal`]                       |
//! | **Subscriber API**| Observe lifecycle events (logging, metrics, audits).          | [`Subscribe`], [`Event`]                 |
//! | **Errors**        | Typed, matchable errors.                                      | [`RunError`], [`ShapeError`], [`LifecycleError`] |
//! | **Configuration** | Signals to honor, bus capacity.                               | [`Config`]                               |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use runlet::{Config, Coroutine, Runner};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = Runner::builder(Config::default()).build(|runner| {
//!         Coroutine::new(move |y| async move {
//!             println!("setup");
//!             // Stop ourselves after a while; Ctrl-C would do the same.
//!             tokio::spawn(async move {
//!                 tokio::time::sleep(Duration::from_millis(10)).await;
//!                 let _ = runner.stop();
//!             });
//!             y.suspend().await;
//!             println!("teardown");
//!             Ok(())
//!         })
//!     });
//!
//!     runner.run()?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use crate::core::{Config, Runner, RunnerBuilder, ShutdownSignal, State};
pub use error::{LifecycleError, RunError, ShapeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxTask, ContextFunction, Coroutine, Step, Suspend, SuspendableTask, Yielder};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
