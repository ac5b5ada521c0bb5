//! Gyre Engine - Scheduler-Aware Reactive Feedback Loops
//!
//! This crate turns a stream of commands into a stream of application state:
//! each command executes against the latest known state and produces mutation
//! events, a pure reducer folds those events into a new state, and the new
//! state is republished so subsequent commands see it.
//!
//! ```text
//! command stream
//!     │
//!     ▼ with_latest_from ◄────────────────┐
//! (command, state snapshot)               │
//!     │                                   │
//!     ▼ execute (contained on failure)    │
//! mutation streams, merged by readiness   │
//!     │                                   │
//!     ▼ reduce (serialized)               │
//! state ──► StateCell (current value) ────┘
//!     │
//!     ▼ consumers, each on its own Executor
//! ```
//!
//! # Guarantees
//!
//! - The reducer runs serially; folds land in completion order, not
//!   submission order, when executions overlap.
//! - A failing command is invisible: contained at the command boundary,
//!   the loop keeps running.
//! - Consumers first observe the initial state, then every folded state,
//!   in order, on the executor they chose.
//! - Cancelling the loop releases every internal subscription and bars
//!   further consumer callbacks before `cancel` returns.
//!
//! The contracts (command, reducer, executor, errors) live in [`gyre_core`].

/// Caller-owned collection of loop handles
pub mod disposables;

/// Tokio-backed serial executor
pub mod executor;

/// The feedback loop and its lifecycle handle
pub mod feedback;

/// Single-slot current-state store
pub mod state;

/// Latest-value join operator
pub mod with_latest;

pub use disposables::{Disposable, Disposables};
pub use executor::SerialExecutor;
pub use feedback::{FeedbackLoop, LoopHandle, LoopPhase};
pub use state::StateCell;
pub use with_latest::{with_latest_from, WithLatestExt, WithLatestFrom};

// One-stop imports for downstream crates.
pub use gyre_core::{
    current_label, mutations, BoxCommand, Command, CommandError, CommandProducer, Executor,
    LoopConfig, MutationStream, Reducer, UpstreamError, UpstreamPolicy,
};
