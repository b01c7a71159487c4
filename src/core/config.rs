//! # Runner configuration.
//!
//! Provides [`Config`] centralized settings for one [`Runner`](crate::Runner).
//!
//! ## Sentinel values
//! - `signals = []` → no OS signal listeners are installed
//! - `bus_capacity = 0` → clamped to 1 by the bus

use crate::core::shutdown::ShutdownSignal;

/// Configuration for a runner.
///
/// ## Field semantics
/// - `signals`: OS signals translated into a stop request while the runner waits
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct Config {
    /// Signals that request a graceful stop.
    ///
    /// Listeners exist only between setup and teardown of one run.
    /// On non-unix platforms only [`ShutdownSignal::Interrupt`] is honored.
    pub signals: Vec<ShutdownSignal>,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events receive
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// Default configuration with no signal listeners.
    ///
    /// Useful when the embedding process handles signals itself.
    pub fn without_signals() -> Self {
        Self {
            signals: Vec::new(),
            ..Self::default()
        }
    }

    /// True if at least one signal listener will be installed.
    #[inline]
    pub fn handles_signals(&self) -> bool {
        !self.signals.is_empty()
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `signals = [SIGINT, SIGTERM]`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            signals: vec![ShutdownSignal::Interrupt, ShutdownSignal::Terminate],
            bus_capacity: 1024,
        }
    }
}
