use std::sync::Arc;

use crate::{
    core::{Config, Runner},
    subscribers::Subscribe,
    tasks::SuspendableTask,
};

/// Builder for constructing a [`Runner`] with custom configuration and subscribers.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use runlet::{Config, Coroutine, Runner, State, Subscribe};
///
/// let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
/// let runner = Runner::builder(Config::without_signals())
///     .with_subscribers(subs)
///     .build(|runner| Coroutine::new(move |y| async move {
///         runner.stop()?;
///         y.suspend().await;
///         Ok(())
///     }));
///
/// runner.run().unwrap();
/// assert_eq!(runner.state(), State::Stopped);
/// ```
pub struct RunnerBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RunnerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runner events through dedicated workers with bounded
    /// queues; every event of a run is delivered before `run()` returns.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds a runner for a context function that takes only the runner.
    pub fn build<F, T>(self, context: F) -> Runner
    where
        F: FnOnce(Runner) -> T + Send + 'static,
        T: SuspendableTask,
    {
        Runner::from_parts(self.cfg, self.subscribers, Box::new(context))
    }

    /// Builds a runner, binding `args` to the context function.
    pub fn build_with_args<F, A, T>(self, context: F, args: A) -> Runner
    where
        F: FnOnce(Runner, A) -> T + Send + 'static,
        A: Send + 'static,
        T: SuspendableTask,
    {
        self.build(move |runner| context(runner, args))
    }
}
