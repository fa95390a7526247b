//! Fake collaborators standing in for yt-dlp.

use async_trait::async_trait;
use serde_json::json;
use song_convert_server::conversion::{
    ConversionError, DownloadBackend, DownloadRequest, ProgressSink, SearchBackend, SearchQuery,
};
use std::time::Duration;

use super::constants::{NO_MATCH_QUERY, UNAVAILABLE_QUERY};

/// Answers every query with three candidates: a short teaser, the song itself
/// (titled exactly like the query, 4 minutes long) and a one-hour loop.
pub struct FakeSearchBackend;

#[async_trait]
impl SearchBackend for FakeSearchBackend {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<String>, ConversionError> {
        if query.text == NO_MATCH_QUERY {
            return Ok(vec![]);
        }
        if query.text == UNAVAILABLE_QUERY {
            return Err(ConversionError::SearchUnavailable(
                "No such file or directory (os error 2)".to_string(),
            ));
        }

        let slug: String = query
            .text
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        Ok(vec![
            json!({
                "title": format!("{} (teaser)", query.text),
                "webpage_url": format!("https://video.test/{}-teaser", slug),
                "duration": 30,
                "uploader": "fan",
                "view_count": 10,
            })
            .to_string(),
            json!({
                "title": query.text,
                "webpage_url": format!("https://video.test/{}", slug),
                "duration": 240,
                "uploader": "fan",
                "view_count": 10,
            })
            .to_string(),
            "this line is not json".to_string(),
            json!({
                "title": format!("{} (1 hour loop)", query.text),
                "webpage_url": format!("https://video.test/{}-loop", slug),
                "duration": 3600,
                "uploader": "fan",
                "view_count": 10,
            })
            .to_string(),
        ])
    }
}

#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
pub enum DownloadBehavior {
    /// Writes `{stem}.{format}` containing the locator.
    Succeed,
    /// Never finishes.
    Hang,
    /// Fails like a non-zero yt-dlp exit.
    Fail,
}

pub struct FakeDownloadBackend {
    pub behavior: DownloadBehavior,
}

#[async_trait]
impl DownloadBackend for FakeDownloadBackend {
    async fn download(
        &self,
        request: &DownloadRequest,
        progress: &dyn ProgressSink,
    ) -> Result<(), ConversionError> {
        progress.report("downloading 10.0%");
        std::fs::write(request.output_dir.join("fragment.part"), b"partial")
            .map_err(|e| ConversionError::FetchFailed(e.to_string()))?;

        match self.behavior {
            DownloadBehavior::Succeed => {
                tokio::time::sleep(Duration::from_millis(20)).await;
                progress.report("transcoding audio");
                std::fs::write(request.expected_artifact(), request.locator.as_bytes())
                    .map_err(|e| ConversionError::FetchFailed(e.to_string()))?;
                Ok(())
            }
            DownloadBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            DownloadBehavior::Fail => Err(ConversionError::FetchFailed(format!(
                "yt-dlp exit code 1: ERROR: unable to write {}",
                request.output_template().display()
            ))),
        }
    }
}
