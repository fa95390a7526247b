//! Audio fetcher: drives the download/transcode collaborator and locates the
//! produced artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::error::ConversionError;
use super::progress::ProgressSink;

/// Everything the download collaborator needs for a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub locator: String,
    pub output_dir: PathBuf,
    pub file_stem: String,
    pub audio_format: String,
    pub audio_bitrate: String,
}

impl DownloadRequest {
    /// Output path template, with the extension left to the collaborator.
    pub fn output_template(&self) -> PathBuf {
        self.output_dir.join(format!("{}.%(ext)s", self.file_stem))
    }

    /// Where the artifact should end up if the collaborator keeps our name.
    pub fn expected_artifact(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.file_stem, self.audio_format))
    }
}

/// The external download/transcode collaborator.
#[async_trait]
pub trait DownloadBackend: Send + Sync {
    async fn download(
        &self,
        request: &DownloadRequest,
        progress: &dyn ProgressSink,
    ) -> Result<(), ConversionError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub audio_format: String,
    pub audio_bitrate: String,
    /// Hard wall-clock bound for a single fetch.
    pub timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            audio_format: "mp3".to_string(),
            audio_bitrate: "192K".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

pub struct AudioFetcher {
    backend: Arc<dyn DownloadBackend>,
    settings: FetchSettings,
}

impl AudioFetcher {
    pub fn new(backend: Arc<dyn DownloadBackend>, settings: FetchSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Download `locator` as audio into `scratch_dir` and return the artifact path.
    ///
    /// A timeout or a missing artifact is reported as `FetchFailed`. Cause texts
    /// never mention `scratch_dir`.
    pub async fn fetch(
        &self,
        locator: &str,
        file_stem: &str,
        scratch_dir: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, ConversionError> {
        let request = DownloadRequest {
            locator: locator.to_string(),
            output_dir: scratch_dir.to_path_buf(),
            file_stem: file_stem.to_string(),
            audio_format: self.settings.audio_format.clone(),
            audio_bitrate: self.settings.audio_bitrate.clone(),
        };

        debug!("Fetching {} as {}", locator, self.settings.audio_format);
        match tokio::time::timeout(
            self.settings.timeout,
            self.backend.download(&request, progress),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.redact_dir(scratch_dir)),
            Err(_) => {
                return Err(ConversionError::FetchFailed(format!(
                    "timed out after {:?}",
                    self.settings.timeout
                )))
            }
        }

        match locate_artifact(scratch_dir, file_stem, &self.settings.audio_format) {
            Ok(Some(path)) => {
                info!("Fetched {} into {:?}", locator, path.file_name().unwrap_or_default());
                Ok(path)
            }
            Ok(None) => Err(ConversionError::FetchFailed(format!(
                "downloader finished but produced no .{} file",
                self.settings.audio_format
            ))),
            Err(e) => Err(ConversionError::FetchFailed(format!(
                "could not inspect output directory: {}",
                e.kind()
            ))),
        }
    }
}

/// Find the artifact produced for `file_stem`.
///
/// The expected `{stem}.{extension}` path is checked first. The external tool
/// sometimes alters the name it writes, so failing that, a single listing of
/// `dir` is scanned (in name order) for the first regular file with the right
/// extension. There is no retry.
pub fn locate_artifact(
    dir: &Path,
    file_stem: &str,
    extension: &str,
) -> std::io::Result<Option<PathBuf>> {
    let expected = dir.join(format!("{}.{}", file_stem, extension));
    if expected.is_file() {
        return Ok(Some(expected));
    }

    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        })
        .collect();
    matches.sort();

    if let Some(found) = matches.first() {
        debug!(
            "Expected artifact {:?} missing, using {:?}",
            expected.file_name().unwrap_or_default(),
            found.file_name().unwrap_or_default()
        );
    }
    Ok(matches.into_iter().next())
}
