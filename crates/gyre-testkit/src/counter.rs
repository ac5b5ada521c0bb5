//! Counter state machine: increments until the value reaches 5, then resets.

use gyre_core::{mutations, Command, CommandError, MutationStream};

/// Counter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counter {
    /// Current counter value.
    pub value: i64,
}

impl Counter {
    /// Counter at a given value.
    pub fn at(value: i64) -> Self {
        Self { value }
    }
}

/// Mutations produced by counter commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterEvent {
    /// Add one to the counter.
    Increment,
    /// Reset the counter to zero.
    Reset,
}

/// Fold a counter event into the state.
pub fn counter_reducer(state: Counter, event: CounterEvent) -> Counter {
    match event {
        CounterEvent::Increment => Counter {
            value: state.value + 1,
        },
        CounterEvent::Reset => Counter { value: 0 },
    }
}

/// Emits [`CounterEvent::Increment`] until the observed value reaches 5,
/// then [`CounterEvent::Reset`]. Can be built failing to exercise error
/// containment.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementCommand {
    fail: bool,
}

impl IncrementCommand {
    /// A succeeding increment.
    pub fn new() -> Self {
        Self { fail: false }
    }

    /// An increment whose execution fails.
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Command for IncrementCommand {
    type State = Counter;
    type Mutation = CounterEvent;

    fn execute(&self, state: Counter) -> MutationStream<CounterEvent> {
        if self.fail {
            return mutations::fail(CommandError::new("injected failure"));
        }
        if state.value >= 5 {
            mutations::one(CounterEvent::Reset)
        } else {
            mutations::one(CounterEvent::Increment)
        }
    }
}

/// A command that emits no mutations at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCommand;

impl Command for NoopCommand {
    type State = Counter;
    type Mutation = CounterEvent;

    fn execute(&self, _state: Counter) -> MutationStream<CounterEvent> {
        mutations::none()
    }
}
