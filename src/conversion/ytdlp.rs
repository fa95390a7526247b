//! yt-dlp adapters for the search and download collaborators.

use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use super::error::ConversionError;
use super::fetcher::{DownloadBackend, DownloadRequest};
use super::progress::ProgressSink;
use super::search::{SearchBackend, SearchQuery};

pub const DEFAULT_YTDLP_PROGRAM: &str = "yt-dlp";

/// Number of trailing stderr lines kept for failure diagnostics.
const STDERR_TAIL_LINES: usize = 8;

lazy_static! {
    static ref DOWNLOAD_PERCENT: Regex =
        Regex::new(r"^\[download\]\s+(\d{1,3}(?:\.\d+)?)%").expect("valid progress regex");
}

pub fn search_args(query: &SearchQuery) -> Vec<String> {
    vec![
        format!("ytsearch{}:{}", query.max_results, query.text),
        "--dump-json".to_string(),
        "--no-warnings".to_string(),
        "--quiet".to_string(),
        "--skip-download".to_string(),
        "--match-filter".to_string(),
        format!("duration < {}", query.max_duration_sec),
    ]
}

pub fn download_args(request: &DownloadRequest) -> Vec<String> {
    vec![
        "-x".to_string(),
        "--audio-format".to_string(),
        request.audio_format.clone(),
        "--audio-quality".to_string(),
        request.audio_bitrate.clone(),
        "--newline".to_string(),
        "--no-playlist".to_string(),
        "-o".to_string(),
        request.output_template().to_string_lossy().into_owned(),
        request.locator.clone(),
    ]
}

/// Map one line of yt-dlp output to a progress message, if it carries one.
pub fn parse_progress_line(line: &str) -> Option<String> {
    let line = line.trim();
    if let Some(caps) = DOWNLOAD_PERCENT.captures(line) {
        return Some(format!("downloading {}%", &caps[1]));
    }
    if line.starts_with("[ExtractAudio]") {
        return Some("transcoding audio".to_string());
    }
    None
}

pub fn format_exit_diagnostics(status: ExitStatus, stderr_tail: &[String]) -> String {
    let code = match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    let detail = stderr_tail
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");
    if detail.is_empty() {
        format!("yt-dlp {}", code)
    } else {
        format!("yt-dlp {}: {}", code, detail)
    }
}

/// Runs `yt-dlp --dump-json` searches.
pub struct YtDlpSearchBackend {
    program: String,
    timeout: Duration,
}

impl YtDlpSearchBackend {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SearchBackend for YtDlpSearchBackend {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<String>, ConversionError> {
        let child = Command::new(&self.program)
            .args(search_args(query))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ConversionError::SearchUnavailable(format!(
                    "could not run {}: {}",
                    self.program, e
                )))
            }
            Err(_) => {
                return Err(ConversionError::SearchUnavailable(format!(
                    "search timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<String> = stderr
                .lines()
                .rev()
                .take(STDERR_TAIL_LINES)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .map(str::to_string)
                .collect();
            let diagnostics = format_exit_diagnostics(output.status, &tail);
            if stdout.trim().is_empty() {
                return Err(ConversionError::SearchUnavailable(diagnostics));
            }
            // Partial results are still usable.
            warn!("Search for '{}' exited abnormally: {}", query.text, diagnostics);
        }

        Ok(stdout.lines().map(str::to_string).collect())
    }
}

/// Runs `yt-dlp -x` downloads, streaming progress from its output.
pub struct YtDlpDownloadBackend {
    program: String,
}

impl YtDlpDownloadBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl DownloadBackend for YtDlpDownloadBackend {
    async fn download(
        &self,
        request: &DownloadRequest,
        progress: &dyn ProgressSink,
    ) -> Result<(), ConversionError> {
        let mut child = Command::new(&self.program)
            .args(download_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ConversionError::FetchFailed(format!("could not run {}: {}", self.program, e))
            })?;

        // Drain stderr concurrently so a chatty child never blocks on a full pipe.
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            let mut last_message = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(message) = parse_progress_line(&line) {
                    if message != last_message {
                        progress.report(&message);
                        last_message = message;
                    }
                }
            }
        }

        let status = child.wait().await.map_err(|e| {
            ConversionError::FetchFailed(format!("could not wait for {}: {}", self.program, e))
        })?;

        let stderr_tail: Vec<String> = match stderr_task {
            Some(task) => task.await.map(Vec::from).unwrap_or_default(),
            None => Vec::new(),
        };

        if status.success() {
            debug!("yt-dlp finished for {}", request.locator);
            Ok(())
        } else {
            Err(ConversionError::FetchFailed(format_exit_diagnostics(
                status,
                &stderr_tail,
            )))
        }
    }
}

/// Check that the yt-dlp executable can be run.
pub async fn check_ytdlp_available(program: &str) -> Result<String, ConversionError> {
    let output = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| ConversionError::SearchUnavailable(format!("{} not found: {}", program, e)))?;

    if !output.status.success() {
        return Err(ConversionError::SearchUnavailable(format!(
            "{} --version failed",
            program
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
