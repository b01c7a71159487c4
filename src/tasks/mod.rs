//! # Context tasks and the two-phase contract.
//!
//! This module provides the task-related types:
//! - [`SuspendableTask`] - trait for a task that is advanced stepwise
//! - [`Step`] - outcome of one advance (suspended or terminated)
//! - [`Coroutine`] / [`Yielder`] - generator-style task written as an `async` block
//! - [`ContextFunction`] - capability that produces the task for a runner

mod context;
mod coroutine;
mod task;

pub use context::{BoxTask, ContextFunction};
pub use coroutine::{Coroutine, Suspend, Yielder};
pub use task::{Step, SuspendableTask};
