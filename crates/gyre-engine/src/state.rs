//! Single-slot current-state store.

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Overwrite-on-write holder of the authoritative current state.
///
/// Seeded at construction, written exactly once per successful fold (single
/// writer), read by every joining command as an immutable snapshot. Readers
/// observe a monotonic sequence of snapshots - there is no shared mutable
/// structure and no lock.
///
/// The cell lives exactly as long as the loop that owns it; dropping it ends
/// every stream obtained through [`StateCell::watch`].
#[derive(Debug)]
pub struct StateCell<S> {
    slot: watch::Sender<S>,
}

impl<S> StateCell<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Create a cell seeded with the initial state.
    pub fn new(initial: S) -> Self {
        let (slot, _) = watch::channel(initial);
        Self { slot }
    }

    /// Overwrite the current state.
    pub fn publish(&self, state: S) {
        self.slot.send_replace(state);
    }

    /// Snapshot of the current state.
    pub fn latest(&self) -> S {
        self.slot.borrow().clone()
    }

    /// Raw subscription to the slot.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.slot.subscribe()
    }

    /// Stream that replays the current value, then yields the latest state
    /// after each overwrite. Intermediate states may coalesce under load;
    /// the latest value is always delivered.
    pub fn watch(&self) -> WatchStream<S> {
        WatchStream::new(self.slot.subscribe())
    }
}
