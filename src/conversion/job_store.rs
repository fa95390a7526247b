//! In-memory job storage.
//!
//! The job store owns every [`ConversionJob`] for its entire lifetime. Callers
//! never get a reference into the table: reads return snapshots and every
//! mutation is a named field-group update applied under a single write lock,
//! so a concurrent reader never observes a half-applied transition.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use thiserror::Error;

use super::models::{ConversionJob, JobResult, JobStats, JobStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobStoreError {
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Job {0} already reached a terminal state")]
    AlreadyTerminal(String),

    #[error("Job {id} cannot go from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job id {0} is already in use")]
    DuplicateId(String),
}

pub type JobStoreResult<T> = Result<T, JobStoreError>;

/// Trait for job storage operations.
///
/// Each state transition is one atomic update of the job's record.
pub trait JobStore: Send + Sync {
    /// Insert a freshly created job. Fails if the id is taken.
    fn insert(&self, job: ConversionJob) -> JobStoreResult<()>;

    /// Snapshot of a job, or `None` if the id was never issued.
    fn get(&self, id: &str) -> Option<ConversionJob>;

    /// queued -> downloading. Sets the start timestamp.
    fn mark_downloading(&self, id: &str, progress: &str) -> JobStoreResult<()>;

    /// Overwrite the progress text of a non-terminal job.
    fn set_progress(&self, id: &str, progress: &str) -> JobStoreResult<()>;

    /// downloading -> completed. Sets result and finish timestamp together.
    fn mark_completed(&self, id: &str, result: JobResult) -> JobStoreResult<()>;

    /// queued|downloading -> failed. Sets error and finish timestamp together.
    fn mark_failed(&self, id: &str, error: &str) -> JobStoreResult<()>;

    /// Most recently created jobs first.
    fn list_recent(&self, limit: usize) -> Vec<ConversionJob>;

    /// Count of jobs per status.
    fn stats(&self) -> JobStats;
}

/// [`JobStore`] backed by a lock-protected hash map. Jobs live for the
/// lifetime of the process.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, ConversionJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves every record in a consistent
    // state (updates are applied after all checks), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ConversionJob>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ConversionJob>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<F>(&self, id: &str, f: F) -> JobStoreResult<()>
    where
        F: FnOnce(&mut ConversionJob) -> JobStoreResult<()>,
    {
        let mut jobs = self.write();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| JobStoreError::UnknownJob(id.to_string()))?;
        f(job)
    }
}

fn check_transition(job: &ConversionJob, allowed: &[JobStatus], to: JobStatus) -> JobStoreResult<()> {
    if job.status.is_terminal() {
        return Err(JobStoreError::AlreadyTerminal(job.id.clone()));
    }
    if !allowed.contains(&job.status) {
        return Err(JobStoreError::InvalidTransition {
            id: job.id.clone(),
            from: job.status,
            to,
        });
    }
    Ok(())
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: ConversionJob) -> JobStoreResult<()> {
        let mut jobs = self.write();
        if jobs.contains_key(&job.id) {
            return Err(JobStoreError::DuplicateId(job.id));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<ConversionJob> {
        self.read().get(id).cloned()
    }

    fn mark_downloading(&self, id: &str, progress: &str) -> JobStoreResult<()> {
        self.update(id, |job| {
            check_transition(job, &[JobStatus::Queued], JobStatus::Downloading)?;
            job.status = JobStatus::Downloading;
            job.progress = progress.to_string();
            job.timestamps.started_at = Some(Utc::now());
            Ok(())
        })
    }

    fn set_progress(&self, id: &str, progress: &str) -> JobStoreResult<()> {
        self.update(id, |job| {
            if job.status.is_terminal() {
                return Err(JobStoreError::AlreadyTerminal(job.id.clone()));
            }
            job.progress = progress.to_string();
            Ok(())
        })
    }

    fn mark_completed(&self, id: &str, result: JobResult) -> JobStoreResult<()> {
        self.update(id, |job| {
            check_transition(job, &[JobStatus::Downloading], JobStatus::Completed)?;
            job.status = JobStatus::Completed;
            job.progress = "Completed".to_string();
            job.result = Some(result);
            job.timestamps.finished_at = Some(Utc::now());
            Ok(())
        })
    }

    fn mark_failed(&self, id: &str, error: &str) -> JobStoreResult<()> {
        self.update(id, |job| {
            check_transition(
                job,
                &[JobStatus::Queued, JobStatus::Downloading],
                JobStatus::Failed,
            )?;
            job.status = JobStatus::Failed;
            job.progress = "Failed".to_string();
            job.error = Some(error.to_string());
            job.timestamps.finished_at = Some(Utc::now());
            Ok(())
        })
    }

    fn list_recent(&self, limit: usize) -> Vec<ConversionJob> {
        let mut jobs: Vec<ConversionJob> = self.read().values().cloned().collect();
        jobs.sort_by(|a, b| {
            b.timestamps
                .created_at
                .cmp(&a.timestamps.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        jobs.truncate(limit);
        jobs
    }

    fn stats(&self) -> JobStats {
        let jobs = self.read();
        let mut stats = JobStats {
            total: jobs.len(),
            ..JobStats::default()
        };
        for job in jobs.values() {
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Downloading => stats.downloading += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}
