//! Recording consumer: collects delivered states and supports awaiting a
//! given count.

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

/// Collects every state handed to its callback.
#[derive(Debug, Default)]
pub struct RecordingConsumer<S> {
    states: Arc<Mutex<Vec<S>>>,
    notify: Arc<Notify>,
}

impl<S> RecordingConsumer<S>
where
    S: Clone + Send + 'static,
{
    /// Empty recorder.
    pub fn new() -> Self {
        Self {
            states: Arc::default(),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Callback to register with a loop's `consume`.
    pub fn callback(&self) -> impl Fn(S) + Send + Sync + 'static {
        let states = self.states.clone();
        let notify = self.notify.clone();
        move |state| {
            states.lock().unwrap().push(state);
            notify.notify_waiters();
        }
    }

    /// Number of states recorded so far.
    pub fn len(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<S> {
        self.states.lock().unwrap().clone()
    }

    /// Wait until at least `n` states have been recorded. Pair with
    /// `tokio::time::timeout` in tests.
    pub async fn wait_for_len(&self, n: usize) {
        loop {
            let notified = self.notify.notified();
            if self.len() >= n {
                return;
            }
            notified.await;
        }
    }
}
