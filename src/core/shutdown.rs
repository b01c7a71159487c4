//! # Cross-platform OS signal translation.
//!
//! Provides [`ShutdownSignal`] and the run-scoped [`SignalListeners`] that turn a
//! delivered signal into [`Runner::handle_signal`].
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::windows::ctrl_c`] (for [`ShutdownSignal::Interrupt`])
//!
//! ## Delivery
//! ```text
//! OS signal ─► signal-hook action ─► socket pair ─► listener task (runner's scheduler)
//!                                                      └─► Runner::handle_signal(sig)
//!                                                             └─► Runner::stop()
//! ```
//! The translation never runs in an asynchronous interrupt context: the OS-level
//! action only writes a byte, and the listener is an ordinary task on the same
//! single-threaded scheduler that drives the context task.
//!
//! ## Scope
//! Registrations live as long as [`SignalListeners`]. On unix, once the last
//! listener for a signal is dropped the signal gets its default action back
//! (SIGINT/SIGTERM/SIGQUIT terminate the process again).

use std::collections::HashSet;
use std::fmt;
use std::io;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::Runner;

/// Termination signals a runner can translate into a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownSignal {
    /// `SIGINT` / Ctrl-C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGQUIT`.
    Quit,
}

impl ShutdownSignal {
    /// Conventional signal name, e.g. `"SIGINT"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Quit => "SIGQUIT",
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(unix)]
mod os {
    use std::collections::HashMap;
    use std::collections::hash_map::Entry;
    use std::io;
    use std::os::raw::c_int;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, LazyLock, Mutex, PoisonError};

    use signal_hook::consts::{SIGINT, SIGQUIT, SIGTERM};
    use signal_hook::low_level::{pipe, unregister};
    use signal_hook::{SigId, flag};

    use super::ShutdownSignal;

    pub(super) type SignalStream = tokio::net::UnixStream;

    /// Per-signal count of live registrations plus the flag that re-enables
    /// the default action when the count drops to zero.
    struct Claim {
        unclaimed: Arc<AtomicBool>,
        active: usize,
    }

    static CLAIMS: LazyLock<Mutex<HashMap<c_int, Claim>>> =
        LazyLock::new(|| Mutex::new(HashMap::new()));

    fn raw(sig: ShutdownSignal) -> c_int {
        match sig {
            ShutdownSignal::Interrupt => SIGINT,
            ShutdownSignal::Terminate => SIGTERM,
            ShutdownSignal::Quit => SIGQUIT,
        }
    }

    fn claim(signo: c_int) -> io::Result<()> {
        let mut claims = CLAIMS.lock().unwrap_or_else(PoisonError::into_inner);
        let claim = match claims.entry(signo) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                // Registered once per process and never removed; it only acts
                // while no run holds the signal.
                let unclaimed = Arc::new(AtomicBool::new(false));
                flag::register_conditional_default(signo, Arc::clone(&unclaimed))?;
                e.insert(Claim {
                    unclaimed,
                    active: 0,
                })
            }
        };
        claim.active += 1;
        claim.unclaimed.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn release(signo: c_int) {
        let mut claims = CLAIMS.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(claim) = claims.get_mut(&signo) {
            claim.active = claim.active.saturating_sub(1);
            if claim.active == 0 {
                claim.unclaimed.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Live registrations for `sig` across all runs in the process.
    #[cfg(test)]
    pub(super) fn active(sig: ShutdownSignal) -> usize {
        CLAIMS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&raw(sig))
            .map_or(0, |c| c.active)
    }

    /// OS-level action for one signal; dropping it unregisters the action and
    /// releases the claim.
    pub(super) struct Registration {
        signo: c_int,
        id: SigId,
    }

    impl Drop for Registration {
        fn drop(&mut self) {
            unregister(self.id);
            release(self.signo);
        }
    }

    /// Registers `sig` to write one byte per delivery into a socket pair and
    /// returns the read half.
    pub(super) fn listen(sig: ShutdownSignal) -> io::Result<Option<(SignalStream, Registration)>> {
        let signo = raw(sig);
        let (read, write) = std::os::unix::net::UnixStream::pair()?;
        read.set_nonblocking(true)?;
        let read = tokio::net::UnixStream::from_std(read)?;

        claim(signo)?;
        let id = match pipe::register(signo, write) {
            Ok(id) => id,
            Err(e) => {
                release(signo);
                return Err(e);
            }
        };
        Ok(Some((read, Registration { signo, id })))
    }

    /// Waits for the next deliveries; `None` once the stream is gone.
    pub(super) async fn next(stream: &mut SignalStream) -> Option<usize> {
        let mut buf = [0u8; 32];
        loop {
            stream.readable().await.ok()?;
            match stream.try_read(&mut buf) {
                Ok(0) => return None,
                Ok(n) => return Some(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(_) => return None,
            }
        }
    }
}

#[cfg(not(unix))]
mod os {
    use std::io;

    use super::ShutdownSignal;

    pub(super) type SignalStream = tokio::signal::windows::CtrlC;

    /// Ctrl-C handlers cannot be unregistered on this platform.
    pub(super) struct Registration;

    pub(super) fn listen(sig: ShutdownSignal) -> io::Result<Option<(SignalStream, Registration)>> {
        match sig {
            ShutdownSignal::Interrupt => {
                tokio::signal::windows::ctrl_c().map(|s| Some((s, Registration)))
            }
            ShutdownSignal::Terminate | ShutdownSignal::Quit => Ok(None),
        }
    }

    pub(super) async fn next(stream: &mut SignalStream) -> Option<usize> {
        stream.recv().await.map(|()| 1)
    }
}

/// Signal listener tasks for one run; dropping the value removes them.
pub(crate) struct SignalListeners {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    registrations: Vec<os::Registration>,
}

impl SignalListeners {
    /// Registers every signal in `signals` (duplicates ignored) and spawns one
    /// listener task per signal on the current scheduler.
    ///
    /// Registration is all-or-nothing: on error, listeners created so far are removed.
    pub(crate) fn install(runner: &Runner, signals: &[ShutdownSignal]) -> io::Result<Self> {
        let mut listeners = Self {
            token: CancellationToken::new(),
            handles: Vec::with_capacity(signals.len()),
            registrations: Vec::with_capacity(signals.len()),
        };

        let mut seen = HashSet::with_capacity(signals.len());
        for &sig in signals {
            if !seen.insert(sig) {
                continue;
            }
            let Some((stream, registration)) = os::listen(sig)? else {
                continue;
            };
            listeners.registrations.push(registration);
            listeners.spawn(runner.clone(), sig, stream);
        }
        Ok(listeners)
    }

    fn spawn(&mut self, runner: Runner, sig: ShutdownSignal, mut stream: os::SignalStream) {
        let token = self.token.clone();
        self.handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    got = os::next(&mut stream) => {
                        let Some(n) = got else { break };
                        for _ in 0..n {
                            // Failures are published as `SignalHandlerFailed`.
                            let _ = runner.handle_signal(sig);
                        }
                    }
                }
            }
        }));
    }

    /// Number of installed listeners.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for SignalListeners {
    fn drop(&mut self) {
        self.token.cancel();
        for h in &self.handles {
            h.abort();
        }
        self.registrations.clear();
    }
}
