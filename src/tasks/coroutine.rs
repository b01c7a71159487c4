//! # Generator-style task written as an `async` block.
//!
//! [`Coroutine`] turns an `async` body into a [`SuspendableTask`]. The body gets a
//! [`Yielder`]; awaiting [`Yielder::suspend`] is the suspension point that separates
//! setup from teardown.
//!
//! ```text
//! Coroutine::new(|y| async move {
//!     setup().await;        ◄── first advance()
//!     y.suspend().await;    ──► Step::Suspended
//!     teardown().await;     ◄── second advance()
//!     Ok(())                ──► Step::Terminated
//! })
//! ```
//!
//! ## Rules
//! - The body is polled **only** inside `advance()`; between advances it makes no progress.
//! - Other awaits in the body (timers, I/O) behave normally while an advance is in flight.
//! - `suspend()` must be awaited by the body itself, not by a task it spawns.
//! - A body error ends the coroutine and is returned from `advance()` unchanged.

use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::TaskError;
use crate::tasks::{Step, SuspendableTask};

/// Flag raised by [`Suspend`] and consumed by the driving `advance()`.
#[derive(Debug, Default)]
struct YieldState {
    suspended: AtomicBool,
}

/// Handle a coroutine body uses to reach its suspension point.
#[derive(Clone, Debug)]
pub struct Yielder {
    state: Arc<YieldState>,
}

impl Yielder {
    /// Returns a future that suspends the coroutine once, then completes on the next advance.
    pub fn suspend(&self) -> Suspend {
        Suspend {
            state: Arc::clone(&self.state),
            raised: false,
        }
    }
}

/// Future returned by [`Yielder::suspend`].
#[must_use = "the coroutine only suspends when this future is awaited"]
#[derive(Debug)]
pub struct Suspend {
    state: Arc<YieldState>,
    raised: bool,
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.raised {
            return Poll::Ready(());
        }
        self.raised = true;
        self.state.suspended.store(true, Ordering::Release);
        // No waker is registered: the driver returns `Suspended` right away and
        // polls again on the next advance.
        Poll::Pending
    }
}

/// Generator-style [`SuspendableTask`] backed by an `async` body.
///
/// # Example
/// ```
/// use runlet::{Coroutine, Step, SuspendableTask};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let mut task = Coroutine::new(|y| async move {
///     // setup
///     y.suspend().await;
///     // teardown
///     Ok(())
/// });
///
/// assert_eq!(task.advance().await.unwrap(), Step::Suspended);
/// assert_eq!(task.advance().await.unwrap(), Step::Terminated);
/// # });
/// ```
pub struct Coroutine {
    body: Option<BoxFuture<'static, Result<(), TaskError>>>,
    state: Arc<YieldState>,
}

impl Coroutine {
    /// Creates a coroutine; `f` is called immediately but the body does not run
    /// until the first advance.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Yielder) -> Fut,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let state = Arc::new(YieldState::default());
        let yielder = Yielder {
            state: Arc::clone(&state),
        };
        Self {
            body: Some(Box::pin(f(yielder))),
            state,
        }
    }

    /// True once the body has run to completion (or failed).
    pub fn is_terminated(&self) -> bool {
        self.body.is_none()
    }
}

impl std::fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coroutine")
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

#[async_trait]
impl SuspendableTask for Coroutine {
    async fn advance(&mut self) -> Result<Step, TaskError> {
        let Some(body) = self.body.as_mut() else {
            return Ok(Step::Terminated);
        };
        let state = &self.state;

        let finished = poll_fn(|cx| {
            state.suspended.store(false, Ordering::Release);
            match body.as_mut().poll(cx) {
                Poll::Ready(res) => Poll::Ready(Some(res)),
                Poll::Pending if state.suspended.swap(false, Ordering::AcqRel) => {
                    Poll::Ready(None)
                }
                Poll::Pending => Poll::Pending,
            }
        })
        .await;

        match finished {
            None => Ok(Step::Suspended),
            Some(res) => {
                self.body = None;
                res.map(|()| Step::Terminated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn single_suspension_runs_both_phases() {
        let phase = Arc::new(AtomicUsize::new(0));
        let p = Arc::clone(&phase);
        let mut co = Coroutine::new(move |y| async move {
            p.store(1, Ordering::SeqCst);
            y.suspend().await;
            p.store(2, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(phase.load(Ordering::SeqCst), 0);
        assert_eq!(co.advance().await.unwrap(), Step::Suspended);
        assert_eq!(phase.load(Ordering::SeqCst), 1);

        // Not polled between advances.
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(phase.load(Ordering::SeqCst), 1);

        assert_eq!(co.advance().await.unwrap(), Step::Terminated);
        assert_eq!(phase.load(Ordering::SeqCst), 2);
        assert!(co.is_terminated());
        assert_eq!(co.advance().await.unwrap(), Step::Terminated);
    }

    #[tokio::test]
    async fn timers_inside_a_phase_complete_normally() {
        let mut co = Coroutine::new(|y| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            y.suspend().await;
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        });

        assert_eq!(co.advance().await.unwrap(), Step::Suspended);
        assert_eq!(co.advance().await.unwrap(), Step::Terminated);
    }

    #[tokio::test]
    async fn body_without_suspension_terminates_on_first_advance() {
        let mut co = Coroutine::new(|_y| async move { Ok(()) });
        assert_eq!(co.advance().await.unwrap(), Step::Terminated);
    }

    #[tokio::test]
    async fn second_suspension_is_reported() {
        let mut co = Coroutine::new(|y| async move {
            y.suspend().await;
            y.suspend().await;
            Ok(())
        });
        assert_eq!(co.advance().await.unwrap(), Step::Suspended);
        assert_eq!(co.advance().await.unwrap(), Step::Suspended);
        assert_eq!(co.advance().await.unwrap(), Step::Terminated);
    }

    #[tokio::test]
    async fn body_error_is_returned_unchanged() {
        let mut co = Coroutine::new(|y| async move {
            y.suspend().await;
            Err(TaskError::from("teardown failed"))
        });
        assert_eq!(co.advance().await.unwrap(), Step::Suspended);
        let err = co.advance().await.unwrap_err();
        assert_eq!(err.to_string(), "teardown failed");
        assert!(co.is_terminated());
    }
}
