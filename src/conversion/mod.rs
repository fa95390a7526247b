//! Asynchronous song conversion pipeline.
//!
//! A convert request becomes a job in the [`JobStore`]; the
//! [`ConversionManager`] resolves the song name to a media item, fetches and
//! transcodes its audio and publishes the result through a [`StorageUploader`].

mod error;
mod fetcher;
mod job_id;
mod job_store;
mod manager;
mod models;
mod progress;
mod ranking;
mod sanitize;
mod search;
mod storage;
mod ytdlp;

pub use error::ConversionError;
pub use fetcher::{locate_artifact, AudioFetcher, DownloadBackend, DownloadRequest, FetchSettings};
pub use job_id::{generate_job_id, job_id_at, JOB_ID_LEN};
pub use job_store::{InMemoryJobStore, JobStore, JobStoreError};
pub use manager::ConversionManager;
pub use models::*;
pub use progress::{NoopProgress, ProgressSink, StoreProgress};
pub use ranking::{
    pick_best, rank_candidates, score_candidate, DurationWindow, RankingSettings,
    DEFAULT_CHANNEL_INDICATORS, DEFAULT_KEYWORDS,
};
pub use sanitize::{sanitize_filename, MAX_FILENAME_LEN};
pub use search::{parse_candidate, SearchBackend, SearchQuery, SearchResolver, SearchSettings};
pub use storage::{LocalMediaStorage, RetrievalDescriptor, StorageUploader};
pub use ytdlp::{
    check_ytdlp_available, YtDlpDownloadBackend, YtDlpSearchBackend, DEFAULT_YTDLP_PROGRAM,
};
