//! Conversion orchestrator and status reporter.
//!
//! `submit` records a job as `queued` before anything else happens, then runs
//! the pipeline on its own tokio task. The task talks back to callers only
//! through the job store:
//!
//! ```text
//! queued -> downloading -> resolve -> fetch (scratch dir) -> upload -> completed
//!                  \___________________________________________/
//!                                     |
//!                                   failed
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, warn};

use super::error::ConversionError;
use super::fetcher::AudioFetcher;
use super::job_id::generate_job_id;
use super::job_store::{JobStore, JobStoreError};
use super::models::{ConversionJob, ConversionRequest, JobResult, JobStats, SubmittedJob};
use super::progress::{ProgressSink, StoreProgress};
use super::sanitize::sanitize_filename;
use super::search::SearchResolver;
use super::storage::StorageUploader;

/// How many fresh ids `submit` tries before giving up on a collision.
const MAX_ID_ATTEMPTS: usize = 3;

const INTERNAL_ERROR_MESSAGE: &str = "Internal error while converting, please try again";

pub struct ConversionManager {
    store: Arc<dyn JobStore>,
    resolver: SearchResolver,
    fetcher: AudioFetcher,
    uploader: Arc<dyn StorageUploader>,
    scratch_root: PathBuf,
}

impl ConversionManager {
    pub fn new(
        store: Arc<dyn JobStore>,
        resolver: SearchResolver,
        fetcher: AudioFetcher,
        uploader: Arc<dyn StorageUploader>,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            resolver,
            fetcher,
            uploader,
            scratch_root: scratch_root.into(),
        }
    }

    /// Create a `queued` job and start its pipeline on a new task.
    ///
    /// The job is in the store when this returns, so an immediate status
    /// poll always finds it. Must be called from within a tokio runtime.
    pub fn submit(self: &Arc<Self>, request: ConversionRequest) -> Result<SubmittedJob, JobStoreError> {
        let mut attempt = 1;
        let job = loop {
            let job = ConversionJob::new(generate_job_id(&request.song_name), request.clone());
            match self.store.insert(job.clone()) {
                Ok(()) => break job,
                Err(JobStoreError::DuplicateId(id)) if attempt < MAX_ID_ATTEMPTS => {
                    warn!("Job id {} collided, generating a new one", id);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            "Queued job {} for '{}' (requester {})",
            job.id, request.song_name, request.requester
        );

        let manager = self.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move {
            manager.run_job(job_id, request).await;
        });

        Ok(SubmittedJob {
            job_id: job.id,
            status: job.status,
        })
    }

    /// Current record of a job, or `UnknownJob` if the id was never issued.
    pub fn status(&self, job_id: &str) -> Result<ConversionJob, ConversionError> {
        self.store
            .get(job_id)
            .ok_or_else(|| ConversionError::UnknownJob(job_id.to_string()))
    }

    pub fn recent_jobs(&self, limit: usize) -> Vec<ConversionJob> {
        self.store.list_recent(limit)
    }

    pub fn stats(&self) -> JobStats {
        self.store.stats()
    }

    async fn run_job(self: Arc<Self>, job_id: String, request: ConversionRequest) {
        if let Err(e) = self.store.mark_downloading(&job_id, "Starting") {
            error!("Job {} could not start: {}", job_id, e);
            return;
        }

        let progress = StoreProgress::new(self.store.clone(), job_id.clone());
        let outcome = AssertUnwindSafe(self.execute(&job_id, &request, &progress))
            .catch_unwind()
            .await;

        let update = match outcome {
            Ok(Ok(result)) => {
                info!("Job {} completed: '{}'", job_id, result.title);
                self.store.mark_completed(&job_id, result)
            }
            Ok(Err(e)) => {
                warn!("Job {} failed ({}): {}", job_id, e.kind(), e);
                self.store.mark_failed(&job_id, &e.user_message())
            }
            Err(panic) => {
                error!("Job {} panicked: {}", job_id, panic_message(&*panic));
                self.store.mark_failed(&job_id, INTERNAL_ERROR_MESSAGE)
            }
        };

        if let Err(e) = update {
            error!("Could not record outcome of job {}: {}", job_id, e);
        }
    }

    async fn execute(
        &self,
        job_id: &str,
        request: &ConversionRequest,
        progress: &dyn ProgressSink,
    ) -> Result<JobResult, ConversionError> {
        let (locator, title, duration_seconds) = match request.direct_locator() {
            Some(url) => {
                progress.report("Using the provided link");
                (url.to_string(), request.song_name.trim().to_string(), None)
            }
            None => {
                let query = request.search_query();
                progress.report(&format!("Searching for {}", query));
                let best = self.resolver.resolve(&query).await?;
                let best = best.ok_or(ConversionError::NotFound { query })?;
                info!(
                    "Job {} matched '{}' (score {})",
                    job_id, best.candidate.title, best.score
                );
                progress.report(&format!("Found: {}", best.candidate.title));
                let duration = Some(best.candidate.duration_seconds).filter(|d| *d > 0);
                (best.candidate.source_url, best.candidate.title, duration)
            }
        };

        tokio::fs::create_dir_all(&self.scratch_root)
            .await
            .map_err(ConversionError::Workspace)?;
        // Removed with all its contents when dropped, whichever way this returns.
        let scratch = tempfile::Builder::new()
            .prefix(&format!("job-{}-", job_id))
            .tempdir_in(&self.scratch_root)
            .map_err(ConversionError::Workspace)?;

        let stem = file_stem_for(&title, job_id);
        let artifact = self
            .fetcher
            .fetch(&locator, &stem, scratch.path(), progress)
            .await?;

        progress.report("Uploading");
        let extension = artifact
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(&self.fetcher.settings().audio_format)
            .to_lowercase();
        let descriptor = self
            .uploader
            .upload(&artifact, &public_name_for(&stem, job_id, &extension))
            .await
            .map_err(|e| e.redact_dir(scratch.path()))?;

        Ok(JobResult {
            title,
            duration_seconds,
            source_url: locator,
            file_name: descriptor.file_name,
            download_url: descriptor.url,
        })
    }
}

/// File stem for a title; the job id stands in when nothing usable is left.
fn file_stem_for(title: &str, job_id: &str) -> String {
    let sanitized = sanitize_filename(title);
    let stem = sanitized.trim_start_matches('.');
    if stem.is_empty() {
        job_id.to_string()
    } else {
        stem.to_string()
    }
}

/// Name an artifact is published under. The job id keeps jobs that resolve
/// to the same title from overwriting each other's files.
fn public_name_for(stem: &str, job_id: &str, extension: &str) -> String {
    format!("{}-{}.{}", stem, job_id, extension)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
