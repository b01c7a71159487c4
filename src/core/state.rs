//! # Lifecycle state machine.
//!
//! ```text
//! NotStarted ──run()──► Running ──stop()──► Stopping ──teardown──► Stopped
//!                          │                                          ▲
//!                          └───────────── error during run ───────────┘
//! ```
//!
//! ## Rules
//! - Transitions are monotonic; no stage is ever re-entered.
//! - `Stopping` means "stop requested, teardown not finished" and is reported as
//!   [`State::Running`].
//! - A second stop is rejected whether or not teardown has finished.

use crate::error::LifecycleError;

/// Observable lifecycle state of a [`Runner`](crate::Runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Constructed, `run()` not called yet.
    NotStarted,
    /// Inside `run()`.
    Running,
    /// `run()` has returned (successfully or not).
    Stopped,
}

/// Internal stage; finer than [`State`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    NotStarted,
    Running,
    Stopping,
    Stopped,
}

impl Stage {
    pub(crate) fn state(self) -> State {
        match self {
            Stage::NotStarted => State::NotStarted,
            Stage::Running | Stage::Stopping => State::Running,
            Stage::Stopped => State::Stopped,
        }
    }

    /// Checks that `run()` may proceed without transitioning.
    pub(crate) fn ensure_startable(self) -> Result<(), LifecycleError> {
        match self {
            Stage::NotStarted => Ok(()),
            _ => Err(LifecycleError::AlreadyStarted),
        }
    }

    /// `NotStarted → Running`.
    pub(crate) fn begin_run(&mut self) -> Result<(), LifecycleError> {
        self.ensure_startable()?;
        *self = Stage::Running;
        Ok(())
    }

    /// `Running → Stopping`.
    pub(crate) fn request_stop(&mut self) -> Result<(), LifecycleError> {
        match self {
            Stage::NotStarted => Err(LifecycleError::NotStarted),
            Stage::Running => {
                *self = Stage::Stopping;
                Ok(())
            }
            Stage::Stopping | Stage::Stopped => Err(LifecycleError::AlreadyStopped),
        }
    }

    /// Any started stage `→ Stopped`.
    pub(crate) fn finish(&mut self) {
        debug_assert_ne!(*self, Stage::NotStarted);
        *self = Stage::Stopped;
    }
}
