//! Tokio-backed serial executor.

use std::sync::Arc;

use tokio::sync::mpsc;

use gyre_core::{Executor, ExecutorIdentity, Job};

/// Named scheduling context with a single drain task.
///
/// Jobs run in submission order, at most one at a time, inside an
/// [`ExecutorIdentity`] scope carrying this executor's label. Jobs should be
/// brief - they run on the runtime's worker threads.
///
/// The drain task ends once every handle to the executor has been dropped
/// and the queue is empty.
#[derive(Debug)]
pub struct SerialExecutor {
    label: String,
    queue: mpsc::UnboundedSender<Job>,
}

impl SerialExecutor {
    /// Create an executor and spawn its drain task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(label: impl Into<String>) -> Arc<Self> {
        let label = label.into();
        let (queue, mut jobs) = mpsc::unbounded_channel::<Job>();

        let worker_label = label.clone();
        tokio::spawn(async move {
            while let Some(job) = jobs.recv().await {
                let _identity = ExecutorIdentity::enter(&worker_label);
                job();
            }
            tracing::debug!(label = %worker_label, "serial executor drained");
        });

        Arc::new(Self { label, queue })
    }
}

impl Executor for SerialExecutor {
    fn label(&self) -> &str {
        &self.label
    }

    fn submit(&self, job: Job) {
        if self.queue.send(job).is_err() {
            tracing::debug!(label = %self.label, "job submitted after shutdown; dropped");
        }
    }
}
