use std::future::Future;
use std::sync::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Spawns background futures on a runtime and remembers their handles so
/// they can be awaited later.
pub struct TaskQueue {
    runtime: Handle,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskQueue {
    /// Queue bound to the runtime of the calling context.
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start `task` in the background without waiting for it.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self.runtime.spawn(task);
        let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Number of submitted tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    /// Wait for every submitted task, including tasks submitted while waiting.
    pub async fn flush(&self) {
        loop {
            let batch: Vec<JoinHandle<()>> = {
                let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
                std::mem::take(&mut *tasks)
            };
            if batch.is_empty() {
                return;
            }

            debug!("Flushing {} background task(s)", batch.len());
            for result in futures::future::join_all(batch).await {
                if let Err(e) = result {
                    error!("Background task failed: {}", e);
                }
            }
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
