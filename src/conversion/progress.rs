//! Progress sinks used by the audio fetcher to surface incremental feedback.

use std::sync::Arc;

use tracing::debug;

use super::job_store::JobStore;

/// Receives human-readable progress messages while a job runs.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

/// A sink that discards every message.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _message: &str) {}
}

/// Writes progress messages into a job's `progress` field.
pub struct StoreProgress {
    store: Arc<dyn JobStore>,
    job_id: String,
}

impl StoreProgress {
    pub fn new(store: Arc<dyn JobStore>, job_id: impl Into<String>) -> Self {
        Self {
            store,
            job_id: job_id.into(),
        }
    }
}

impl ProgressSink for StoreProgress {
    fn report(&self, message: &str) {
        debug!("Job {} progress: {}", self.job_id, message);
        // A job that already reached a terminal state simply ignores late updates.
        if let Err(e) = self.store.set_progress(&self.job_id, message) {
            debug!("Dropped progress update for job {}: {}", self.job_id, e);
        }
    }
}
