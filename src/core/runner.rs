//! # Runner: drives one two-phase context task until stopped.
//!
//! ## Run flow
//! ```text
//! run()
//!   ├─► NotStarted → Running            (else LifecycleError::AlreadyStarted)
//!   ├─► build current-thread scheduler  (owned by this call)
//!   └─► block_on(drive):
//!         ├─► publish RunStarting
//!         ├─► task = context(runner, args...)
//!         ├─► task.advance()            setup      Terminated → ShapeError::NotSuspendable
//!         ├─► publish SetupCompleted
//!         ├─► install signal listeners  SIGINT/SIGTERM → handle_signal → stop()
//!         ├─► stop.cancelled().await    (timers, spawned tasks, listeners keep running)
//!         ├─► task.advance()            teardown   Suspended → ShapeError::MultipleYield
//!         ├─► remove signal listeners   (default signal action restored)
//!         ├─► publish TeardownCompleted
//!         └─► → Stopped, publish RunStopped / RunFailed, drain subscribers
//!             (a panic in the task unwinds out of run() but still ends Stopped)
//! ```
//!
//! ## Rules
//! - Setup completes before the wait; stop is observed before teardown begins;
//!   teardown completes before `run()` returns.
//! - There is no timeout: a task that never finishes teardown blocks `run()`.
//! - Task-body errors are returned as [`RunError::Task`] without wrapping.
//! - The stage lock is never held across an await.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::{Builder, Handle};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::core::builder::RunnerBuilder;
use crate::core::shutdown::{ShutdownSignal, SignalListeners};
use crate::core::state::{Stage, State};
use crate::core::Config;
use crate::error::{LifecycleError, RunError, ShapeError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::{ContextFunction, Step, SuspendableTask};

/// Lifecycle runner for a single cooperative two-phase task.
///
/// `Runner` is a cheap-clone handle: the clone handed to the context function
/// controls the same lifecycle as the caller's copy.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use runlet::{Coroutine, Runner};
///
/// let runner = Runner::with_args(
///     |runner, (port, name): (u16, &'static str)| {
///         Coroutine::new(move |y| async move {
///             println!("{name}: listening on {port}");
///             tokio::spawn(async move {
///                 tokio::time::sleep(Duration::from_secs(1)).await;
///                 let _ = runner.stop();
///             });
///             y.suspend().await;
///             println!("{name}: closed");
///             Ok(())
///         })
///     },
///     (8080, "api"),
/// );
/// runner.run().expect("clean run");
/// ```
#[derive(Clone)]
pub struct Runner {
    inner: Arc<Inner>,
}

struct Inner {
    stage: Mutex<Stage>,
    stop: CancellationToken,
    context: Mutex<Option<Box<dyn ContextFunction>>>,
    cfg: Config,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Runner {
    /// Creates a runner with the default [`Config`] for a context function that
    /// takes only the runner.
    pub fn new<F, T>(context: F) -> Self
    where
        F: FnOnce(Runner) -> T + Send + 'static,
        T: SuspendableTask,
    {
        RunnerBuilder::new(Config::default()).build(context)
    }

    /// Creates a runner with the default [`Config`], binding `args` to the context
    /// function. They are passed after the runner when the task is created.
    pub fn with_args<F, A, T>(context: F, args: A) -> Self
    where
        F: FnOnce(Runner, A) -> T + Send + 'static,
        A: Send + 'static,
        T: SuspendableTask,
    {
        RunnerBuilder::new(Config::default()).build_with_args(context, args)
    }

    /// Creates a builder for a runner with custom configuration or subscribers.
    pub fn builder(cfg: Config) -> RunnerBuilder {
        RunnerBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        cfg: Config,
        subscribers: Vec<Arc<dyn Subscribe>>,
        context: Box<dyn ContextFunction>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            inner: Arc::new(Inner {
                stage: Mutex::new(Stage::NotStarted),
                stop: CancellationToken::new(),
                context: Mutex::new(Some(context)),
                cfg,
                bus,
                subscribers,
            }),
        }
    }

    /// Runs the context task through setup and teardown, blocking the calling thread.
    ///
    /// # Errors
    /// - [`LifecycleError::AlreadyStarted`] if the runner is running or has run.
    /// - [`RunError::NestedScheduler`] if called on a thread already driving a tokio runtime.
    /// - [`RunError::Scheduler`] if the runtime cannot be built.
    /// - [`ShapeError`] if the task does not suspend exactly once.
    /// - [`RunError::Signal`] if signal listeners cannot be registered.
    /// - [`RunError::Task`] if the task body fails.
    ///
    /// The last four leave the runner `Stopped`; the first three leave it untouched.
    /// A panic in the task body unwinds out of `run()` and also leaves it `Stopped`.
    pub fn run(&self) -> Result<(), RunError> {
        let rt = {
            let mut stage = self.lock_stage();
            stage.ensure_startable()?;
            if Handle::try_current().is_ok() {
                return Err(RunError::NestedScheduler);
            }
            let rt = Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(RunError::Scheduler)?;
            stage.begin_run()?;
            rt
        };
        let _finished = FinishGuard(self);

        rt.block_on(async {
            let forwarder = Forwarder::spawn(&self.inner.bus, &self.inner.subscribers);
            self.publish(Event::new(EventKind::RunStarting));

            let res = self.drive().await;
            self.finish(&res);

            if let Some(forwarder) = forwarder {
                forwarder.close(&self.inner.bus).await;
            }
            res
        })
    }

    /// Requests a graceful stop, unblocking the wait between setup and teardown.
    ///
    /// # Errors
    /// - [`LifecycleError::NotStarted`] before `run()`.
    /// - [`LifecycleError::AlreadyStopped`] on any call after the first accepted one,
    ///   whether or not teardown has finished, and after a failed run.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        self.lock_stage().request_stop()?;
        self.inner.stop.cancel();
        self.publish(Event::new(EventKind::StopRequested));
        Ok(())
    }

    /// Translates a delivered OS signal into [`stop`](Self::stop).
    ///
    /// Called by the run's signal listeners; may also be called directly to
    /// simulate a signal. A rejected stop is published as
    /// [`EventKind::SignalHandlerFailed`] and returned.
    pub fn handle_signal(&self, signal: ShutdownSignal) -> Result<(), LifecycleError> {
        self.publish(Event::new(EventKind::SignalReceived).with_signal(signal));
        self.stop().inspect_err(|e| {
            self.publish(
                Event::new(EventKind::SignalHandlerFailed)
                    .with_signal(signal)
                    .with_reason(e.to_string()),
            );
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.lock_stage().state()
    }

    /// True once a stop has been accepted for this runner.
    pub fn is_stop_requested(&self) -> bool {
        self.inner.stop.is_cancelled()
    }

    /// Returns a receiver for events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Configuration this runner was built with.
    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    async fn drive(&self) -> Result<(), RunError> {
        let context = self
            .inner
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(LifecycleError::AlreadyStarted)?;
        let mut task = context.call(self.clone());

        if task.advance().await.map_err(RunError::Task)? == Step::Terminated {
            return Err(ShapeError::NotSuspendable.into());
        }
        self.publish(Event::new(EventKind::SetupCompleted));

        let listeners =
            SignalListeners::install(self, &self.inner.cfg.signals).map_err(RunError::Signal)?;

        self.inner.stop.cancelled().await;

        let step = task.advance().await.map_err(RunError::Task)?;
        drop(listeners);
        match step {
            Step::Terminated => {
                self.publish(Event::new(EventKind::TeardownCompleted));
                Ok(())
            }
            Step::Suspended => Err(ShapeError::MultipleYield.into()),
        }
    }

    fn finish(&self, res: &Result<(), RunError>) {
        self.lock_stage().finish();
        let ev = match res {
            Ok(()) => Event::new(EventKind::RunStopped),
            Err(e) => Event::new(EventKind::RunFailed).with_reason(e.to_string()),
        };
        self.publish(ev);
    }

    fn publish(&self, ev: Event) {
        self.inner.bus.publish(ev);
    }

    fn lock_stage(&self) -> MutexGuard<'_, Stage> {
        self.inner
            .stage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Moves the stage to `Stopped` when `run()` exits, including by unwinding.
struct FinishGuard<'a>(&'a Runner);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.lock_stage().finish();
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("state", &self.state())
            .field("stop_requested", &self.is_stop_requested())
            .field("subscribers", &self.inner.subscribers.len())
            .finish()
    }
}

/// Run-scoped bridge from the bus to the subscriber set.
struct Forwarder {
    done: CancellationToken,
    handle: JoinHandle<()>,
}

impl Forwarder {
    /// Subscribes to `bus` synchronously, so no event published afterwards is missed.
    /// Returns `None` when there is nobody to forward to.
    fn spawn(bus: &Bus, subscribers: &[Arc<dyn Subscribe>]) -> Option<Self> {
        let set = SubscriberSet::new(subscribers.to_vec(), bus.clone());
        if set.is_empty() {
            return None;
        }
        let mut rx = bus.subscribe();
        let done = CancellationToken::new();
        let stop = done.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(&ev),
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            set.shutdown().await;
        });
        Some(Self { done, handle })
    }

    /// Delivers everything published so far, then stops the subscriber workers.
    ///
    /// A forwarder that panicked is reported on the bus.
    async fn close(self, bus: &Bus) {
        self.done.cancel();
        if let Some(ev) = join_report(self.handle.await) {
            bus.publish(ev);
        }
    }
}

fn join_report(res: Result<(), JoinError>) -> Option<Event> {
    match res {
        Ok(()) => None,
        Err(je) => Some(Event::subscriber_panicked("forwarder", je.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::TaskError;
    use crate::tasks::Coroutine;

    fn quiet() -> Config {
        Config::without_signals()
    }

    fn stop_later(runner: Runner, after: Duration) {
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            runner.stop().expect("first stop is accepted");
        });
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        kinds
    }

    #[test]
    fn runs_setup_and_teardown_exactly_once() {
        let setups = Arc::new(AtomicUsize::new(0));
        let teardowns = Arc::new(AtomicUsize::new(0));
        let (s, t) = (Arc::clone(&setups), Arc::clone(&teardowns));

        let runner = Runner::builder(quiet()).build(move |runner| {
            Coroutine::new(move |y| async move {
                s.fetch_add(1, Ordering::SeqCst);
                stop_later(runner, Duration::from_millis(10));
                y.suspend().await;
                t.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });
        assert_eq!(runner.state(), State::NotStarted);

        runner.run().unwrap();
        assert_eq!(setups.load(Ordering::SeqCst), 1);
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
        assert_eq!(runner.state(), State::Stopped);
        assert!(runner.is_stop_requested());
    }

    #[test]
    fn clean_run_publishes_lifecycle_in_order() {
        let runner = Runner::builder(quiet()).build(|runner| {
            Coroutine::new(move |y| async move {
                runner.stop().unwrap();
                y.suspend().await;
                Ok(())
            })
        });
        let mut rx = runner.subscribe();
        runner.run().unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                EventKind::RunStarting,
                EventKind::StopRequested,
                EventKind::SetupCompleted,
                EventKind::TeardownCompleted,
                EventKind::RunStopped,
            ]
        );
    }

    #[test]
    fn teardown_waits_for_stop() {
        let stopped_at_teardown = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&stopped_at_teardown);

        let runner = Runner::builder(quiet()).build(move |runner| {
            let watcher = runner.clone();
            Coroutine::new(move |y| async move {
                stop_later(runner, Duration::from_millis(20));
                y.suspend().await;
                if watcher.is_stop_requested() {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
                assert_eq!(watcher.state(), State::Running);
                Ok(())
            })
        });
        runner.run().unwrap();
        assert_eq!(stopped_at_teardown.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bound_arguments_reach_the_context() {
        let runner = Runner::builder(quiet()).build_with_args(
            |runner, (a, b): (i32, &'static str)| {
                Coroutine::new(move |y| async move {
                    assert_eq!(a, 1);
                    assert_eq!(b, "s");
                    stop_later(runner, Duration::from_millis(10));
                    y.suspend().await;
                    Ok(())
                })
            },
            (1, "s"),
        );
        runner.run().unwrap();
    }

    #[test]
    fn signal_translation_stops_the_run() {
        let runner = Runner::builder(quiet()).build(|runner| {
            Coroutine::new(move |y| async move {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    runner.handle_signal(ShutdownSignal::Interrupt).unwrap();
                });
                y.suspend().await;
                Ok(())
            })
        });
        let mut rx = runner.subscribe();
        runner.run().unwrap();

        let kinds = drain(&mut rx);
        let sig = kinds
            .iter()
            .position(|k| *k == EventKind::SignalReceived)
            .unwrap();
        assert_eq!(kinds[sig + 1], EventKind::StopRequested);
    }

    #[test]
    fn second_signal_is_reported_not_raised() {
        let runner = Runner::builder(quiet()).build(|runner| {
            Coroutine::new(move |y| async move {
                runner.handle_signal(ShutdownSignal::Terminate).unwrap();
                let err = runner.handle_signal(ShutdownSignal::Terminate).unwrap_err();
                assert_eq!(err, LifecycleError::AlreadyStopped);
                y.suspend().await;
                Ok(())
            })
        });
        let mut rx = runner.subscribe();
        runner.run().unwrap();

        let failed: Vec<Event> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|ev| ev.kind == EventKind::SignalHandlerFailed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].signal, Some(ShutdownSignal::Terminate));
        assert_eq!(failed[0].reason.as_deref(), Some("Already stopped"));
    }

    #[test]
    fn task_without_suspension_is_a_shape_error() {
        let runner =
            Runner::builder(quiet()).build(|_runner| Coroutine::new(|_y| async move { Ok(()) }));
        let err = runner.run().unwrap_err();
        assert_eq!(err.as_shape(), Some(ShapeError::NotSuspendable));
        assert_eq!(err.to_string(), "Argument is not async generator");
        assert_eq!(runner.state(), State::Stopped);
    }

    #[test]
    fn second_suspension_is_detected_after_teardown_advance() {
        let runner = Runner::builder(quiet()).build(|runner| {
            Coroutine::new(move |y| async move {
                stop_later(runner, Duration::from_millis(10));
                y.suspend().await;
                y.suspend().await;
                Ok(())
            })
        });
        let mut rx = runner.subscribe();
        let err = runner.run().unwrap_err();
        assert_eq!(err.as_shape(), Some(ShapeError::MultipleYield));
        assert!(err.to_string().contains("has more than one 'yield'"));

        let kinds = drain(&mut rx);
        assert!(kinds.contains(&EventKind::StopRequested));
        assert!(!kinds.contains(&EventKind::TeardownCompleted));
        assert_eq!(kinds.last(), Some(&EventKind::RunFailed));
    }

    #[test]
    fn nested_run_is_already_started() {
        let checked = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&checked);
        let runner = Runner::builder(quiet()).build(move |runner| {
            Coroutine::new(move |y| async move {
                let err = runner.run().unwrap_err();
                assert_eq!(err.as_lifecycle(), Some(LifecycleError::AlreadyStarted));
                c.fetch_add(1, Ordering::SeqCst);
                stop_later(runner, Duration::from_millis(10));
                y.suspend().await;
                Ok(())
            })
        });
        runner.run().unwrap();
        assert_eq!(checked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_before_run_is_not_started() {
        let runner = Runner::new(|_runner| {
            Coroutine::new(|y| async move {
                y.suspend().await;
                Ok(())
            })
        });
        assert_eq!(runner.stop(), Err(LifecycleError::NotStarted));
        assert_eq!(runner.state(), State::NotStarted);
    }

    #[test]
    fn lifecycle_is_monotonic_after_run() {
        let runner = Runner::builder(quiet()).build(|runner| {
            Coroutine::new(move |y| async move {
                stop_later(runner, Duration::from_millis(10));
                y.suspend().await;
                Ok(())
            })
        });
        runner.run().unwrap();

        assert_eq!(runner.stop(), Err(LifecycleError::AlreadyStopped));
        let err = runner.run().unwrap_err();
        assert_eq!(err.as_lifecycle(), Some(LifecycleError::AlreadyStarted));
        assert_eq!(runner.state(), State::Stopped);
    }

    #[test]
    fn double_stop_within_a_run_is_rejected() {
        let runner = Runner::builder(quiet()).build(|runner| {
            Coroutine::new(move |y| async move {
                runner.stop().unwrap();
                assert_eq!(runner.stop(), Err(LifecycleError::AlreadyStopped));
                y.suspend().await;
                assert_eq!(runner.stop(), Err(LifecycleError::AlreadyStopped));
                Ok(())
            })
        });
        runner.run().unwrap();
    }

    #[test]
    fn failed_run_rejects_later_stop() {
        let runner =
            Runner::builder(quiet()).build(|_runner| Coroutine::new(|_y| async move { Ok(()) }));
        assert!(runner.run().is_err());
        assert!(!runner.is_stop_requested());
        assert_eq!(runner.stop(), Err(LifecycleError::AlreadyStopped));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("database unreachable")]
    struct Unreachable;

    async fn connect() -> Result<(), TaskError> {
        Err(TaskError::from(Unreachable))
    }

    #[test]
    fn setup_error_propagates_unmodified() {
        let teardowns = Arc::new(AtomicUsize::new(0));
        let t = Arc::clone(&teardowns);
        let runner = Runner::builder(quiet()).build(move |_runner| {
            Coroutine::new(move |y| async move {
                connect().await?;
                y.suspend().await;
                t.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });

        let err = runner.run().unwrap_err();
        assert_eq!(err.as_label(), "task_failed");
        let inner = err.into_task_error().unwrap();
        assert!(inner.downcast_ref::<Unreachable>().is_some());
        assert_eq!(teardowns.load(Ordering::SeqCst), 0);
        assert_eq!(runner.state(), State::Stopped);
    }

    #[test]
    fn teardown_error_propagates_unmodified() {
        let runner = Runner::builder(quiet()).build(|runner| {
            Coroutine::new(move |y| async move {
                runner.stop().unwrap();
                y.suspend().await;
                Err(TaskError::from("flush failed"))
            })
        });
        let err = runner.run().unwrap_err();
        assert_eq!(err.to_string(), "flush failed");
    }

    #[tokio::test]
    async fn run_inside_a_scheduler_is_rejected() {
        let runner =
            Runner::builder(quiet()).build(|_runner| Coroutine::new(|_y| async move { Ok(()) }));
        let err = runner.run().unwrap_err();
        assert!(matches!(err, RunError::NestedScheduler));
        assert_eq!(runner.state(), State::NotStarted);
    }

    struct Manual {
        advances: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SuspendableTask for Manual {
        async fn advance(&mut self) -> Result<Step, TaskError> {
            match self.advances.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(Step::Suspended),
                _ => Ok(Step::Terminated),
            }
        }
    }

    #[test]
    fn hand_written_tasks_are_driven_twice() {
        let advances = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&advances);
        let runner = Runner::builder(quiet()).build(move |runner| {
            runner.stop().unwrap();
            Manual { advances: a }
        });
        runner.run().unwrap();
        assert_eq!(advances.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stop_from_another_thread() {
        let runner = Runner::builder(quiet()).build(|_runner| {
            Coroutine::new(|y| async move {
                y.suspend().await;
                Ok(())
            })
        });
        let remote = runner.clone();
        let stopper = std::thread::spawn(move || {
            while remote.state() != State::Running {
                std::thread::sleep(Duration::from_millis(1));
            }
            remote.stop()
        });
        runner.run().unwrap();
        assert_eq!(stopper.join().unwrap(), Ok(()));
    }

    fn explode() -> Result<(), TaskError> {
        panic!("setup blew up")
    }

    #[test]
    fn panicking_task_leaves_runner_stopped() {
        let runner = Runner::builder(quiet()).build(|_runner| {
            Coroutine::new(|y| async move {
                explode()?;
                y.suspend().await;
                Ok(())
            })
        });

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| runner.run()));
        assert!(outcome.is_err());
        assert_eq!(runner.state(), State::Stopped);
        assert_eq!(runner.stop(), Err(LifecycleError::AlreadyStopped));
        assert!(matches!(
            runner.run(),
            Err(RunError::Lifecycle(LifecycleError::AlreadyStarted))
        ));
    }

    #[tokio::test]
    async fn forwarder_panic_becomes_an_event() {
        assert!(join_report(Ok(())).is_none());

        let res: Result<(), JoinError> = tokio::spawn(async { panic!("forwarder died") }).await;
        let ev = join_report(res).expect("panic is reported");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.subscriber, Some("forwarder"));
    }
}
