//! Caller-owned collection of loop handles.

use crate::feedback::LoopHandle;

/// Anything that can be cancelled as part of a teardown sweep.
pub trait Disposable: Send {
    /// Cancel the underlying resource. Idempotent.
    fn cancel(&self);
}

impl<S> Disposable for LoopHandle<S>
where
    S: Send + Sync + 'static,
{
    fn cancel(&self) {
        LoopHandle::cancel(self);
    }
}

/// Accumulates loop handles and cancels them together on teardown.
///
/// Cancels everything it still holds when dropped.
#[derive(Default)]
pub struct Disposables {
    items: Vec<Box<dyn Disposable>>,
}

impl Disposables {
    /// Empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a handle.
    pub fn retain(&mut self, disposable: impl Disposable + 'static) {
        self.items.push(Box::new(disposable));
    }

    /// Cancel and release everything held.
    pub fn cancel_all(&mut self) {
        for disposable in self.items.drain(..) {
            disposable.cancel();
        }
    }

    /// Number of handles held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Drop for Disposables {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
