//! # LogWriter — simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [run-starting]
//! [setup-completed]
//! [signal] SIGINT
//! [stop-requested]
//! [teardown-completed]
//! [run-stopped]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let signal = e.signal.map(|s| s.as_str()).unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("unknown");

        match e.kind {
            EventKind::RunStarting => println!("[run-starting]"),
            EventKind::SetupCompleted => println!("[setup-completed]"),
            EventKind::StopRequested => println!("[stop-requested]"),
            EventKind::TeardownCompleted => println!("[teardown-completed]"),
            EventKind::RunStopped => println!("[run-stopped]"),
            EventKind::RunFailed => println!("[run-failed] err={reason}"),
            EventKind::SignalReceived => println!("[signal] {signal}"),
            EventKind::SignalHandlerFailed => {
                println!("[signal-handler-failed] signal={signal} err={reason}");
            }
            EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-overflow] subscriber={} reason={reason}",
                    e.subscriber.unwrap_or("unknown")
                );
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={} info={reason}",
                    e.subscriber.unwrap_or("unknown")
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
