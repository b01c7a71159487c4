//! Runner core: lifecycle state machine, phase driving, signal translation.
//!
//! The public API from this module is [`Runner`] (with [`RunnerBuilder`]),
//! its [`Config`], the observable [`State`] and [`ShutdownSignal`].
//!
//! Internal modules:
//! - [`runner`]: drives the context task through setup, wait and teardown;
//! - [`state`]: monotonic lifecycle transitions;
//! - [`shutdown`]: cross-platform signal listeners scoped to one run;
//! - [`builder`]: runner construction with config and subscribers;
//! - [`config`]: runner settings.

mod builder;
mod config;
mod runner;
mod shutdown;
mod state;

pub use builder::RunnerBuilder;
pub use config::Config;
pub use runner::Runner;
pub use shutdown::ShutdownSignal;
pub use state::State;
