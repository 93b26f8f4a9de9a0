//! Cooperative stop signaling for background monitor tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::error;

/// Handle to a spawned monitor task.
///
/// `stop` only signals; the task observes the flag at the top of its wait
/// loop and may finish its current pass before exiting. A stopped monitor
/// is not restartable; construct a fresh instance instead.
pub struct MonitorHandle {
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn new(stopped: Arc<AtomicBool>, task: JoinHandle<()>) -> Self {
        Self { stopped, task }
    }

    /// Signal the task to exit. Returns once the signal is set.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    /// Wait for the task to finish.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!(error = %e, "Monitor task terminated abnormally");
        }
    }
}
