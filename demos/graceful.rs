//! # Example: graceful
//!
//! A "server" that opens a resource in setup, ticks until Ctrl-C (or a 5s
//! self-stop), then closes the resource in teardown.
//!
//! ## Flow
//! ```text
//! Runner::run()
//!     ├─► [run-starting]
//!     ├─► setup: open resource, spawn ticker
//!     ├─► [setup-completed]
//!     ├─► Ctrl-C ─► [signal] SIGINT ─► [stop-requested]
//!     ├─► teardown: close resource
//!     ├─► [teardown-completed]
//!     └─► [run-stopped]
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example graceful --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use runlet::{Config, Coroutine, LogWriter, Runner};
use tokio_util::sync::CancellationToken;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let runner = Runner::builder(Config::default())
        .with_subscriber(Arc::new(LogWriter::new()))
        .build_with_args(
            |runner, tick: Duration| {
                Coroutine::new(move |y| async move {
                    println!("[demo] opening resource");
                    let ticker = CancellationToken::new();
                    let stop_ticker = ticker.clone();
                    tokio::spawn(async move {
                        let mut n = 0u32;
                        loop {
                            tokio::select! {
                                _ = stop_ticker.cancelled() => break,
                                _ = tokio::time::sleep(tick) => {
                                    n += 1;
                                    println!("[demo] tick {n}");
                                }
                            }
                        }
                    });

                    let self_stop = runner.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        let _ = self_stop.stop();
                    });

                    y.suspend().await;

                    ticker.cancel();
                    println!("[demo] closing resource");
                    Ok(())
                })
            },
            Duration::from_millis(500),
        );

    runner.run()?;
    Ok(())
}
