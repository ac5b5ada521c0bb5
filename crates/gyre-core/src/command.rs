//! Command contract.
//!
//! A command is a unit of work that, given an immutable snapshot of the
//! current state, produces a lazy sequence of mutations or fails. Commands
//! never touch state directly; all state change flows through the reducer.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::Stream;
use futures::StreamExt;

use crate::error::CommandError;

/// Lazy, possibly multi-valued, possibly infinite sequence of mutations.
///
/// An `Err` item ends the sequence as far as the loop is concerned: mutations
/// already emitted stand, the error is contained at the command boundary, and
/// nothing of it reaches the reducer or downstream consumers.
pub type MutationStream<M> = BoxStream<'static, Result<M, CommandError>>;

/// A unit of work executed against a state snapshot.
///
/// Execution is a pure function of the command and the snapshot; the snapshot
/// is the latest state observed when the command joined the loop and may be
/// one step behind the true current state if another command's mutations fold
/// concurrently.
pub trait Command: Send + Sync + 'static {
    /// Application state the command observes.
    type State: Clone + Send + Sync + 'static;
    /// Mutation values the command emits.
    type Mutation: Send + 'static;

    /// Execute against a state snapshot, producing a mutation sequence.
    ///
    /// Zero mutations is legal (a command that performs a side effect and
    /// emits nothing). Failure must be expressed as an `Err` item in the
    /// returned stream; it never escapes the loop.
    fn execute(&self, state: Self::State) -> MutationStream<Self::Mutation>;
}

/// Shared, type-erased command.
///
/// A command stream carries a single item type, so heterogeneous commands are
/// boxed behind this alias. Homogeneous streams can use their concrete type
/// directly - the loop is generic over [`Command`].
pub type BoxCommand<S, M> = Arc<dyn Command<State = S, Mutation = M>>;

impl<C> Command for Arc<C>
where
    C: Command + ?Sized,
{
    type State = C::State;
    type Mutation = C::Mutation;

    fn execute(&self, state: Self::State) -> MutationStream<Self::Mutation> {
        (**self).execute(state)
    }
}

/// Source of the initial command stream - the sole entry point into a loop.
pub trait CommandProducer: Send + 'static {
    /// Command type carried by the produced stream.
    type Cmd: Command;

    /// Materialize the command stream.
    fn produce(self) -> BoxStream<'static, Self::Cmd>;
}

impl<F, St, C> CommandProducer for F
where
    F: FnOnce() -> St + Send + 'static,
    St: Stream<Item = C> + Send + 'static,
    C: Command,
{
    type Cmd = C;

    fn produce(self) -> BoxStream<'static, C> {
        self().boxed()
    }
}

/// Constructors for the common mutation-stream shapes.
pub mod mutations {
    use futures::future;
    use futures::stream;
    use futures::StreamExt;

    use super::MutationStream;
    use crate::error::CommandError;

    /// No mutations at all.
    pub fn none<M: Send + 'static>() -> MutationStream<M> {
        stream::empty().boxed()
    }

    /// Exactly one mutation.
    pub fn one<M: Send + 'static>(mutation: M) -> MutationStream<M> {
        stream::once(future::ready(Ok(mutation))).boxed()
    }

    /// A finite sequence of mutations, emitted in order.
    pub fn many<M: Send + 'static>(items: impl IntoIterator<Item = M>) -> MutationStream<M> {
        let items: Vec<_> = items.into_iter().map(Ok).collect();
        stream::iter(items).boxed()
    }

    /// A failing execution: no mutations, one contained error.
    pub fn fail<M: Send + 'static>(error: CommandError) -> MutationStream<M> {
        stream::once(future::ready(Err(error))).boxed()
    }
}
