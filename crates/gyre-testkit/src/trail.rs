//! Trail fixtures: commands tagged with a name, a state collecting the tags
//! in fold order. Used to assert completion-order folding.

use std::time::Duration;

use futures::StreamExt;

use gyre_core::{mutations, Command, MutationStream};

/// State accumulating tags in the order they were folded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trail {
    /// Tags in fold order.
    pub entries: Vec<String>,
}

/// A tag to append to the trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailEvent(pub String);

/// Append the tag to the trail.
pub fn trail_reducer(mut state: Trail, event: TrailEvent) -> Trail {
    state.entries.push(event.0);
    state
}

/// Emits its tag, optionally after a delay (tokio time, so paused-clock
/// tests control it).
#[derive(Debug, Clone)]
pub struct TaggedCommand {
    tag: String,
    delay: Option<Duration>,
}

impl TaggedCommand {
    /// Emit `tag` immediately.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            delay: None,
        }
    }

    /// Emit `tag` after `delay`.
    pub fn delayed(tag: impl Into<String>, delay: Duration) -> Self {
        Self {
            tag: tag.into(),
            delay: Some(delay),
        }
    }
}

impl Command for TaggedCommand {
    type State = Trail;
    type Mutation = TrailEvent;

    fn execute(&self, _state: Trail) -> MutationStream<TrailEvent> {
        let tag = self.tag.clone();
        match self.delay {
            None => mutations::one(TrailEvent(tag)),
            Some(delay) => futures::stream::once(async move {
                tokio::time::sleep(delay).await;
                Ok(TrailEvent(tag))
            })
            .boxed(),
        }
    }
}
