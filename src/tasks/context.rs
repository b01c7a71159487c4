//! # Context function: the capability that creates the runner's task.
//!
//! A context function is invoked once per run with the [`Runner`] itself, so the
//! task can stop its own runner (after a timer, on a condition, ...). Extra
//! arguments are bound at construction with [`Runner::with_args`].

use crate::core::Runner;
use crate::tasks::SuspendableTask;

/// Type-erased task owned by a running [`Runner`].
pub type BoxTask = Box<dyn SuspendableTask>;

/// # Produces the two-phase task for one run.
///
/// Implemented for every `FnOnce(Runner) -> T` where `T: SuspendableTask`.
pub trait ContextFunction: Send + 'static {
    /// Consumes the function and creates the task.
    fn call(self: Box<Self>, runner: Runner) -> BoxTask;
}

impl<F, T> ContextFunction for F
where
    F: FnOnce(Runner) -> T + Send + 'static,
    T: SuspendableTask,
{
    fn call(self: Box<Self>, runner: Runner) -> BoxTask {
        Box::new((*self)(runner))
    }
}
