//! Data models for the conversion pipeline.
//!
//! Defines jobs, their statuses and timestamps, inbound requests and the
//! ephemeral search candidates considered while resolving a song name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Completed, // terminal
    Failed,    // terminal
}

impl JobStatus {
    /// Returns true if this is a terminal state (Completed or Failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pre-validated convert request as handed over by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Free-text song name, e.g. "Lemon 米津玄師".
    pub song_name: String,
    /// Optional source hint: either a direct URL or extra search terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hint: Option<String>,
    /// Opaque identity of whoever asked for the song.
    pub requester: String,
}

impl ConversionRequest {
    pub fn new(song_name: impl Into<String>, requester: impl Into<String>) -> Self {
        Self {
            song_name: song_name.into(),
            source_hint: None,
            requester: requester.into(),
        }
    }

    pub fn with_source_hint(mut self, hint: impl Into<String>) -> Self {
        self.source_hint = Some(hint.into());
        self
    }

    /// The hint, if it is a direct http(s) locator that can skip search.
    pub fn direct_locator(&self) -> Option<&str> {
        self.source_hint
            .as_deref()
            .map(str::trim)
            .filter(|hint| hint.starts_with("http://") || hint.starts_with("https://"))
    }

    /// Text sent to the search collaborator.
    ///
    /// Non-URL hints are appended to the song name as extra search terms.
    pub fn search_query(&self) -> String {
        let song_name = self.song_name.trim();
        match self.source_hint.as_deref().map(str::trim) {
            Some(hint) if !hint.is_empty() && self.direct_locator().is_none() => {
                format!("{} {}", song_name, hint)
            }
            _ => song_name.to_string(),
        }
    }
}

/// Lifecycle timestamps of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobTimestamps {
    pub created_at: DateTime<Utc>,
    /// Set on the first execution tick (queued -> downloading).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Set exactly once, on the terminal transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Outcome of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    /// Title of the resolved media item.
    pub title: String,
    /// Duration in seconds, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    /// Locator of the source media item.
    pub source_url: String,
    /// Public name the artifact was stored under.
    pub file_name: String,
    /// Retrieval link returned by the storage backend.
    pub download_url: String,
}

/// A tracked convert request, from `queued` to a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionJob {
    pub id: String,
    pub status: JobStatus,
    pub request: ConversionRequest,
    /// Human-readable, observational only.
    pub progress: String,
    pub timestamps: JobTimestamps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionJob {
    /// Create a new job in the `queued` state.
    pub fn new(id: String, request: ConversionRequest) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            request,
            progress: "Queued".to_string(),
            timestamps: JobTimestamps {
                created_at: Utc::now(),
                started_at: None,
                finished_at: None,
            },
            result: None,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Response handed back to the caller right after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedJob {
    pub job_id: String,
    pub status: JobStatus,
}

/// Per-status job counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub queued: usize,
    pub downloading: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

/// One search result considered during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchCandidate {
    pub title: String,
    pub source_url: String,
    pub duration_seconds: u64,
    pub publisher_name: String,
    pub view_count: u64,
}

/// A candidate together with the score it got in a single ranking pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
    pub candidate: SearchCandidate,
    pub score: u32,
}
