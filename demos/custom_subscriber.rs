//! # Example: custom_subscriber
//!
//! Counts lifecycle events with a user-defined [`Subscribe`] implementation and
//! prints the tally after `run()` returns (every event is delivered by then).
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use runlet::{Config, Coroutine, Event, EventKind, Runner, Subscribe};

#[derive(Default)]
struct Tally {
    lifecycle: AtomicUsize,
    signals: AtomicUsize,
}

#[async_trait]
impl Subscribe for Tally {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::SignalReceived | EventKind::SignalHandlerFailed => {
                self.signals.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.lifecycle.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn name(&self) -> &'static str {
        "tally"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tally = Arc::new(Tally::default());

    let runner = Runner::builder(Config::without_signals())
        .with_subscriber(tally.clone())
        .build(|runner| {
            Coroutine::new(move |y| async move {
                runner.stop()?;
                y.suspend().await;
                Ok(())
            })
        });

    runner.run()?;
    println!(
        "lifecycle events: {}, signal events: {}",
        tally.lifecycle.load(Ordering::Relaxed),
        tally.signals.load(Ordering::Relaxed)
    );
    Ok(())
}
