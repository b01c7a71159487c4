//! # Suspendable, two-phase unit of work.
//!
//! A [`SuspendableTask`] is advanced by the runner exactly twice:
//!
//! ```text
//! advance() ─► setup runs    ─► Step::Suspended   (required)
//!   ... runner waits for stop ...
//! advance() ─► teardown runs ─► Step::Terminated  (required)
//! ```
//!
//! Any other outcome is a shape violation reported by the runner.

use async_trait::async_trait;

use crate::error::TaskError;

/// Outcome of one [`SuspendableTask::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The task reached a suspension point and can be advanced again.
    Suspended,
    /// The task ran to completion; further advances are no-ops.
    Terminated,
}

/// # A task that can be advanced stepwise to its next suspension point.
///
/// Most callers use [`Coroutine`](crate::Coroutine); implement this trait
/// directly for hand-written state machines.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use runlet::{Step, SuspendableTask, TaskError};
///
/// struct Server { phase: u8 }
///
/// #[async_trait]
/// impl SuspendableTask for Server {
///     async fn advance(&mut self) -> Result<Step, TaskError> {
///         self.phase += 1;
///         match self.phase {
///             1 => Ok(Step::Suspended),   // bind sockets...
///             _ => Ok(Step::Terminated),  // close them...
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait SuspendableTask: Send + 'static {
    /// Runs the task until its next suspension point or until it terminates.
    ///
    /// An `Err` is the task body's own failure and is propagated by the runner unchanged.
    async fn advance(&mut self) -> Result<Step, TaskError>;
}

#[async_trait]
impl SuspendableTask for Box<dyn SuspendableTask> {
    async fn advance(&mut self) -> Result<Step, TaskError> {
        (**self).advance().await
    }
}
