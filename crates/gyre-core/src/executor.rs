//! Scheduling context contract.
//!
//! An executor names a scheduling context and guarantees that submitted jobs
//! run one at a time, in submission order, with the executor's identity
//! observable from inside the job. The engine never creates threads of its
//! own; executors are injected by the caller.

use std::cell::RefCell;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Named scheduling context with in-order, serialized job delivery.
pub trait Executor: Send + Sync + 'static {
    /// The context's name, e.g. `"consume-queue-1"`.
    fn label(&self) -> &str;

    /// Enqueue a job. Jobs run in submission order, never concurrently
    /// with each other, and inside an [`ExecutorIdentity`] scope carrying
    /// this executor's label.
    fn submit(&self, job: Job);
}

thread_local! {
    static CURRENT_LABEL: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// The label of the executor currently running this code, if any.
///
/// Identity is injected by executor implementations via
/// [`ExecutorIdentity::enter`] rather than read from ambient thread state,
/// so it works the same under any runtime.
pub fn current_label() -> Option<String> {
    CURRENT_LABEL.with(|label| label.borrow().clone())
}

/// Scoped executor-identity marker.
///
/// Executor implementations wrap each job invocation in an identity scope so
/// that [`current_label`] answers correctly inside the job:
///
/// ```
/// use gyre_core::{current_label, ExecutorIdentity};
///
/// let _scope = ExecutorIdentity::enter("my-queue");
/// assert_eq!(current_label().as_deref(), Some("my-queue"));
/// ```
#[derive(Debug)]
pub struct ExecutorIdentity {
    previous: Option<String>,
}

impl ExecutorIdentity {
    /// Enter an identity scope. The previous identity is restored when the
    /// returned guard drops.
    pub fn enter(label: &str) -> Self {
        let previous = CURRENT_LABEL.with(|current| current.replace(Some(label.to_owned())));
        Self { previous }
    }
}

impl Drop for ExecutorIdentity {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_LABEL.with(|current| *current.borrow_mut() = previous);
    }
}
