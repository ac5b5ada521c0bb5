//! Gyre Testing Infrastructure
//!
//! Common fixtures for exercising feedback loops: a counter state machine
//! mirroring the canonical increment/reset scenario, trail fixtures for
//! fold-ordering assertions, and a recording consumer for awaiting delivered
//! states.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;

use gyre_core::{BoxCommand, Command};

/// Counter state machine fixtures
pub mod counter;

/// Recording consumer
pub mod recording;

/// Trail fixtures for fold-ordering assertions
pub mod trail;

pub use counter::{counter_reducer, Counter, CounterEvent, IncrementCommand, NoopCommand};
pub use recording::RecordingConsumer;
pub use trail::{trail_reducer, TaggedCommand, Trail, TrailEvent};

/// Erase a command for use in a heterogeneous command stream.
pub fn boxed<C: Command>(command: C) -> BoxCommand<C::State, C::Mutation> {
    Arc::new(command)
}

/// Install an env-filtered fmt subscriber for test debugging. Safe to call
/// from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
