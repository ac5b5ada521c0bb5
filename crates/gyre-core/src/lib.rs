//! Gyre Core - Feedback-Loop Contracts
//!
//! This crate defines the pure contracts of the Gyre feedback-loop engine.
//! It contains only trait definitions, error types, and configuration values;
//! the runtime lives in `gyre-engine`, which defines **how** these contracts
//! are driven.
//!
//! # Contracts
//!
//! - [`Command`]: a unit of work that, given a state snapshot, produces a lazy
//!   sequence of mutations or fails.
//! - [`Reducer`]: a pure, total fold `(State, Mutation) -> State`.
//! - [`Executor`]: a named scheduling context that runs jobs one at a time, in
//!   submission order.
//! - [`CommandProducer`]: the sole entry point into a loop - a way to obtain
//!   the initial command stream.
//!
//! # Error containment
//!
//! A command failure ([`CommandError`]) is always contained at the command
//! boundary: it ends that command's mutation sequence and never reaches the
//! reducer or any downstream consumer. Failure of the command source itself
//! ([`UpstreamError`]) is a configuration choice, see [`UpstreamPolicy`].

// === Core Modules ===

/// Command contract and mutation stream constructors
pub mod command;

/// Loop configuration values
pub mod config;

/// Error taxonomy
pub mod error;

/// Scheduling context contract and executor identity
pub mod executor;

/// Reducer contract
pub mod reducer;

pub use command::{mutations, BoxCommand, Command, CommandProducer, MutationStream};
pub use config::{LoopConfig, UpstreamPolicy};
pub use error::{CommandError, UpstreamError};
pub use executor::{current_label, Executor, ExecutorIdentity, Job};
pub use reducer::Reducer;
