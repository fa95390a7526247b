//! Error taxonomy of the conversion pipeline.

use std::path::Path;

use thiserror::Error;

/// Errors that can end a conversion job, plus the status lookup miss.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("No match found for '{query}'")]
    NotFound { query: String },

    #[error("Search collaborator unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Audio fetch failed: {0}")]
    FetchFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Failed to prepare job workspace: {0}")]
    Workspace(#[source] std::io::Error),
}

impl ConversionError {
    /// Short machine-friendly name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionError::NotFound { .. } => "not_found",
            ConversionError::SearchUnavailable(_) => "search_unavailable",
            ConversionError::FetchFailed(_) => "fetch_failed",
            ConversionError::UploadFailed(_) => "upload_failed",
            ConversionError::UnknownJob(_) => "unknown_job",
            ConversionError::Workspace(_) => "workspace",
        }
    }

    /// Returns true if submitting the same request again may succeed.
    ///
    /// A "no match" answer will not change on retry; infrastructure failures may.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConversionError::SearchUnavailable(_)
                | ConversionError::FetchFailed(_)
                | ConversionError::UploadFailed(_)
                | ConversionError::Workspace(_)
        )
    }

    /// Text stored in a failed job's `error` field.
    ///
    /// Never contains filesystem paths or internal details beyond the cause text.
    pub fn user_message(&self) -> String {
        match self {
            ConversionError::NotFound { query } => {
                format!("No match found for \"{}\". Try a different song name.", query)
            }
            ConversionError::SearchUnavailable(_) => {
                "Search service is unavailable right now. Please try again later.".to_string()
            }
            ConversionError::FetchFailed(cause) => format!("Audio download failed: {}", cause),
            ConversionError::UploadFailed(cause) => format!("Upload failed: {}", cause),
            ConversionError::UnknownJob(_) => "Unknown job".to_string(),
            ConversionError::Workspace(_) => {
                "Internal error: could not prepare a working directory".to_string()
            }
        }
    }

    /// Replaces every occurrence of `dir` in the cause text with `<scratch>`.
    pub(crate) fn redact_dir(self, dir: &Path) -> Self {
        let dir = dir.to_string_lossy();
        if dir.is_empty() {
            return self;
        }
        let redact = |s: String| s.replace(dir.as_ref(), "<scratch>");
        match self {
            ConversionError::FetchFailed(cause) => ConversionError::FetchFailed(redact(cause)),
            ConversionError::UploadFailed(cause) => ConversionError::UploadFailed(redact(cause)),
            ConversionError::SearchUnavailable(cause) => {
                ConversionError::SearchUnavailable(redact(cause))
            }
            other => other,
        }
    }
}
