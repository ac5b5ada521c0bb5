//! The feedback loop and its lifecycle handle.
//!
//! A loop subscribes to a command stream, joins it with the current state,
//! executes commands, folds the resulting mutations, and republishes each
//! new state as the current value for future joins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future;
use futures::stream::{BoxStream, SelectAll};
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;

use gyre_core::{
    Command, CommandProducer, Executor, LoopConfig, MutationStream, Reducer, UpstreamError,
    UpstreamPolicy,
};

use crate::state::StateCell;
use crate::with_latest::WithLatestExt;

type StateCallback<S> = Arc<dyn Fn(S) + Send + Sync>;
type ConsumerEntry<S> = (Arc<dyn Executor>, StateCallback<S>);
type CommandSpy<C> = Arc<dyn Fn(&C) + Send + Sync>;

/// Lifecycle of a feedback loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Built but not yet started.
    Idle,
    /// Subscribed: pairing commands with state, executing, reducing.
    Running,
    /// Command stream finished and every execution drained. Terminal.
    Completed,
    /// Cancelled by the caller (or by dropping the handle). Terminal.
    Cancelled,
}

impl LoopPhase {
    /// Whether the loop has released its resources.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopPhase::Completed | LoopPhase::Cancelled)
    }
}

/// Builder for a feedback loop over commands of type `C`.
///
/// ```no_run
/// use std::sync::Arc;
/// use gyre_engine::{FeedbackLoop, SerialExecutor};
/// use gyre_core::{mutations, Command, MutationStream};
///
/// struct Bump;
///
/// impl Command for Bump {
///     type State = i64;
///     type Mutation = i64;
///     fn execute(&self, _state: i64) -> MutationStream<i64> {
///         mutations::one(1)
///     }
/// }
///
/// # async fn run() {
/// let commands = futures::stream::iter(vec![Bump, Bump]);
/// let handle = FeedbackLoop::new(0i64, |state, delta| state + delta)
///     .commands(commands)
///     .consume(SerialExecutor::spawn("ui"), |state| println!("{state}"))
///     .start();
/// handle.join().await;
/// # }
/// ```
pub struct FeedbackLoop<C: Command> {
    initial: C::State,
    reducer: Arc<dyn Reducer<C::State, C::Mutation>>,
    commands: Option<BoxStream<'static, Result<C, UpstreamError>>>,
    config: LoopConfig,
    consumers: Vec<ConsumerEntry<C::State>>,
    spy: Option<CommandSpy<C>>,
}

impl<C: Command> FeedbackLoop<C> {
    /// Start building a loop from an initial state and a reducer.
    pub fn new(initial: C::State, reducer: impl Reducer<C::State, C::Mutation>) -> Self {
        Self {
            initial,
            reducer: Arc::new(reducer),
            commands: None,
            config: LoopConfig::default(),
            consumers: Vec::new(),
            spy: None,
        }
    }

    /// Set the command stream - the sole entry point into the loop.
    pub fn commands<St>(mut self, commands: St) -> Self
    where
        St: Stream<Item = C> + Send + 'static,
    {
        self.commands = Some(commands.map(Ok).boxed());
        self
    }

    /// Set a command stream whose source may itself fail. The reaction to a
    /// failure is configured via [`LoopConfig::upstream_policy`].
    pub fn fallible_commands<St>(mut self, commands: St) -> Self
    where
        St: Stream<Item = Result<C, UpstreamError>> + Send + 'static,
    {
        self.commands = Some(commands.boxed());
        self
    }

    /// Obtain the command stream from a producer.
    pub fn producer<P>(self, producer: P) -> Self
    where
        P: CommandProducer<Cmd = C>,
    {
        self.commands(producer.produce())
    }

    /// Replace the loop configuration.
    pub fn config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Observe each command as it joins the loop. Observation only - the
    /// hook cannot alter the command or the loop.
    pub fn on_command(mut self, spy: impl Fn(&C) + Send + Sync + 'static) -> Self {
        self.spy = Some(Arc::new(spy));
        self
    }

    /// Register a consumer. Each emitted state is delivered to `callback`
    /// on `executor`, in emission order. Repeatable; consumers are
    /// independent read-only observers and never affect the loop itself.
    pub fn consume(
        mut self,
        executor: Arc<dyn Executor>,
        callback: impl Fn(C::State) + Send + Sync + 'static,
    ) -> Self {
        self.consumers.push((executor, Arc::new(callback)));
        self
    }

    /// Start the loop. Must be called from within a Tokio runtime.
    ///
    /// Seeds the current-state store with the initial value and makes it the
    /// first observable state, before any computed state.
    pub fn start(self) -> LoopHandle<C::State> {
        let Self {
            initial,
            reducer,
            commands,
            config,
            consumers,
            spy,
        } = self;

        let cell = StateCell::new(initial.clone());
        let state_rx = cell.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (phase_tx, phase_rx) = watch::channel(LoopPhase::Idle);
        let phase_tx = Arc::new(phase_tx);
        let cancelled = Arc::new(AtomicBool::new(false));
        let commands = commands.unwrap_or_else(|| futures::stream::empty().boxed());

        let _ = phase_tx.send(LoopPhase::Running);
        tracing::debug!("feedback loop started");

        let drive = Drive {
            reducer,
            cell,
            config,
            consumers: consumers.into(),
            spy,
            cancelled: cancelled.clone(),
            shutdown: shutdown_rx,
            phase: phase_tx.clone(),
        };
        let task = tokio::spawn(drive.run(initial, commands));

        LoopHandle {
            phase_tx,
            phase_rx,
            shutdown_tx,
            cancelled,
            state_rx,
            task,
        }
    }
}

/// Running loop instance: phase observation, state access, cancellation.
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct LoopHandle<S> {
    phase_tx: Arc<watch::Sender<LoopPhase>>,
    phase_rx: watch::Receiver<LoopPhase>,
    shutdown_tx: watch::Sender<bool>,
    cancelled: Arc<AtomicBool>,
    state_rx: watch::Receiver<S>,
    task: JoinHandle<()>,
}

impl<S> LoopHandle<S> {
    /// Current lifecycle phase.
    pub fn phase(&self) -> LoopPhase {
        *self.phase_rx.borrow()
    }

    /// Cancel the loop.
    ///
    /// Bars further consumer callbacks before returning, then stops the
    /// drive task and releases every internal subscription (command stream,
    /// join, state store). Idempotent; a no-op on a completed loop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);
        self.task.abort();
        let changed = self.phase_tx.send_if_modified(|phase| {
            if phase.is_terminal() {
                false
            } else {
                *phase = LoopPhase::Cancelled;
                true
            }
        });
        if changed {
            tracing::debug!("feedback loop cancelled");
        }
    }

    /// Wait until the loop reaches a terminal phase.
    pub async fn join(&self) {
        let mut phase_rx = self.phase_rx.clone();
        let _ = phase_rx.wait_for(LoopPhase::is_terminal).await;
    }

    /// Hand the handle to a caller-owned [`Disposables`](crate::Disposables)
    /// collection.
    pub fn disposed_by(self, disposables: &mut crate::Disposables)
    where
        S: Send + Sync + 'static,
    {
        disposables.retain(self);
    }
}

impl<S> LoopHandle<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Snapshot of the latest emitted state (the initial value until the
    /// first fold).
    pub fn latest(&self) -> S {
        self.state_rx.borrow().clone()
    }

    /// Stream of states for transformation chaining: replays the latest
    /// state, then yields each new one. Read-only and best-effort - a slow
    /// reader observes the latest state, never a stalled loop. The stream
    /// ends when the loop terminates.
    pub fn states(&self) -> WatchStream<S> {
        WatchStream::new(self.state_rx.clone())
    }
}

impl<S> Drop for LoopHandle<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct Drive<C: Command> {
    reducer: Arc<dyn Reducer<C::State, C::Mutation>>,
    cell: StateCell<C::State>,
    config: LoopConfig,
    consumers: Arc<[ConsumerEntry<C::State>]>,
    spy: Option<CommandSpy<C>>,
    cancelled: Arc<AtomicBool>,
    shutdown: watch::Receiver<bool>,
    phase: Arc<watch::Sender<LoopPhase>>,
}

impl<C: Command> Drive<C> {
    async fn run(mut self, initial: C::State, commands: BoxStream<'static, Result<C, UpstreamError>>) {
        // Seed replay: the initial value is observable before any computed
        // state.
        self.deliver(initial.clone());

        let mut joined = commands.with_latest_from(self.cell.watch());
        let mut inflight: SelectAll<BoxStream<'static, C::Mutation>> = SelectAll::new();
        let mut state = initial;
        let mut commands_open = true;

        loop {
            if !commands_open && inflight.is_empty() {
                self.finish(LoopPhase::Completed);
                return;
            }

            // Fold-stage polling is biased ahead of command admission:
            // a fully synchronous command cycle folds and republishes before
            // the next command joins, while a pending execution lets new
            // commands join concurrently. Folds land in completion order.
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => {
                    self.finish(LoopPhase::Cancelled);
                    return;
                }
                Some(mutation) = inflight.next(), if !inflight.is_empty() => {
                    if self.cancelled.load(Ordering::SeqCst) {
                        self.finish(LoopPhase::Cancelled);
                        return;
                    }
                    state = self.reducer.reduce(state, mutation);
                    self.cell.publish(state.clone());
                    self.deliver(state.clone());
                }
                pair = joined.next(), if commands_open => match pair {
                    Some((Ok(command), snapshot)) => {
                        if let Some(spy) = &self.spy {
                            spy(&command);
                        }
                        inflight.push(contain(command.execute(snapshot)));
                    }
                    Some((Err(error), _)) => match self.config.upstream_policy {
                        UpstreamPolicy::Absorb => {
                            tracing::warn!(%error, "command source failed; absorbing");
                        }
                        UpstreamPolicy::Propagate => {
                            tracing::warn!(%error, "command source failed; completing loop");
                            commands_open = false;
                        }
                    },
                    None => commands_open = false,
                },
            }
        }
    }

    fn deliver(&self, state: C::State) {
        for (executor, callback) in self.consumers.iter() {
            let callback = callback.clone();
            let cancelled = self.cancelled.clone();
            let state = state.clone();
            executor.submit(Box::new(move || {
                // Re-checked at run time: a queued delivery is a no-op once
                // the loop is cancelled.
                if !cancelled.load(Ordering::SeqCst) {
                    callback(state);
                }
            }));
        }
    }

    fn finish(&self, phase: LoopPhase) {
        let changed = self.phase.send_if_modified(|current| {
            if current.is_terminal() {
                false
            } else {
                *current = phase;
                true
            }
        });
        if changed {
            tracing::debug!(?phase, "feedback loop terminated");
        }
    }
}

/// Contain a command failure at the command boundary: mutations already
/// emitted stand, the error ends the command's sequence, the loop never
/// sees it.
fn contain<M: Send + 'static>(mutations: MutationStream<M>) -> BoxStream<'static, M> {
    mutations
        .take_while(|item| {
            if let Err(error) = item {
                tracing::warn!(%error, "command failed; dropping its remaining mutations");
            }
            future::ready(item.is_ok())
        })
        .filter_map(|item| future::ready(item.ok()))
        .boxed()
}
