//! Error types used by the runner and by context tasks.
//!
//! This module defines:
//!
//! - [`ShapeError`] — the context task does not have the two-phase shape.
//! - [`LifecycleError`] — an operation was invoked in the wrong lifecycle state.
//! - [`RunError`] — everything [`Runner::run`](crate::Runner::run) can fail with.
//! - [`TaskError`] — an error raised by the task body itself.
//!
//! All enums provide `as_label` (stable snake_case label) for logs/metrics.

use thiserror::Error;

/// Error raised by a task body during setup or teardown.
///
/// The runner never wraps or inspects it; it surfaces through
/// [`RunError::Task`] exactly as the task returned it.
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # The context task violated the two-phase contract.
///
/// A context task must suspend exactly once: code before the suspension point
/// is setup, code after it is teardown.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    /// The task terminated on its first advance without ever suspending.
    #[error("Argument is not async generator")]
    NotSuspendable,

    /// The task suspended again when advanced for teardown.
    #[error("context function has more than one 'yield'")]
    MultipleYield,
}

impl ShapeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use runlet::ShapeError;
    ///
    /// assert_eq!(ShapeError::MultipleYield.as_label(), "shape_multiple_yield");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ShapeError::NotSuspendable => "shape_not_suspendable",
            ShapeError::MultipleYield => "shape_multiple_yield",
        }
    }
}

/// # An operation was invoked in the wrong lifecycle state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// `run()` was called on a runner that is running or has already run.
    #[error("Already started")]
    AlreadyStarted,

    /// `stop()` was called before `run()`.
    #[error("Not started")]
    NotStarted,

    /// `stop()` was called after a stop had already been requested for this run.
    #[error("Already stopped")]
    AlreadyStopped,
}

impl LifecycleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use runlet::LifecycleError;
    ///
    /// assert_eq!(LifecycleError::NotStarted.as_label(), "lifecycle_not_started");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleError::AlreadyStarted => "lifecycle_already_started",
            LifecycleError::NotStarted => "lifecycle_not_started",
            LifecycleError::AlreadyStopped => "lifecycle_already_stopped",
        }
    }
}

/// # Errors produced by [`Runner::run`](crate::Runner::run).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError {
    /// The context task does not have the two-phase shape.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// `run()` was invoked in the wrong lifecycle state.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The task body failed during setup or teardown.
    #[error(transparent)]
    Task(TaskError),

    /// OS signal listeners could not be registered.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),

    /// The scheduler (current-thread runtime) could not be built.
    #[error("failed to build scheduler: {0}")]
    Scheduler(#[source] std::io::Error),

    /// `run()` was called on a thread that is already driving another scheduler.
    #[error("cannot block on a runner from inside another scheduler")]
    NestedScheduler,
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use runlet::{RunError, ShapeError};
    ///
    /// let err = RunError::from(ShapeError::NotSuspendable);
    /// assert_eq!(err.as_label(), "shape_not_suspendable");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Shape(e) => e.as_label(),
            RunError::Lifecycle(e) => e.as_label(),
            RunError::Task(_) => "task_failed",
            RunError::Signal(_) => "signal_install_failed",
            RunError::Scheduler(_) => "scheduler_build_failed",
            RunError::NestedScheduler => "scheduler_nested",
        }
    }

    /// Returns the shape violation, if this is one.
    pub fn as_shape(&self) -> Option<ShapeError> {
        match self {
            RunError::Shape(e) => Some(*e),
            _ => None,
        }
    }

    /// Returns the lifecycle violation, if this is one.
    pub fn as_lifecycle(&self) -> Option<LifecycleError> {
        match self {
            RunError::Lifecycle(e) => Some(*e),
            _ => None,
        }
    }

    /// Consumes the error and returns the task body's error, if this is one.
    pub fn into_task_error(self) -> Option<TaskError> {
        match self {
            RunError::Task(e) => Some(e),
            _ => None,
        }
    }
}
