//! Resolves a free-text query to the single best-matching media item.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::error::ConversionError;
use super::models::{ScoredCandidate, SearchCandidate};
use super::ranking::{pick_best, RankingSettings};

/// A bounded search request sent to the search collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub max_results: usize,
    /// Only candidates strictly shorter than this are requested.
    pub max_duration_sec: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    pub max_results: usize,
    pub max_duration_sec: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: 3,
            max_duration_sec: 600,
        }
    }
}

/// The external search collaborator.
///
/// Returns one raw record per line; parsing is left to the resolver so that a
/// single malformed record does not spoil the whole answer.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<String>, ConversionError>;
}

#[derive(Debug, Error)]
pub enum MalformedCandidate {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

#[derive(Deserialize)]
struct RawSearchRecord {
    title: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    view_count: Option<u64>,
}

/// Parse one structured search record.
///
/// Title and locator are required. Missing duration or views count as zero,
/// missing publisher as an empty name.
pub fn parse_candidate(line: &str) -> Result<SearchCandidate, MalformedCandidate> {
    let raw: RawSearchRecord = serde_json::from_str(line)?;

    let title = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or(MalformedCandidate::MissingField("title"))?;
    let source_url = raw
        .webpage_url
        .or(raw.url)
        .filter(|u| !u.trim().is_empty())
        .ok_or(MalformedCandidate::MissingField("webpage_url"))?;
    let duration_seconds = raw
        .duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| d.round() as u64)
        .unwrap_or(0);

    Ok(SearchCandidate {
        title,
        source_url,
        duration_seconds,
        publisher_name: raw.uploader.or(raw.channel).unwrap_or_default(),
        view_count: raw.view_count.unwrap_or(0),
    })
}

pub struct SearchResolver {
    backend: Arc<dyn SearchBackend>,
    settings: SearchSettings,
    ranking: RankingSettings,
}

impl SearchResolver {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        settings: SearchSettings,
        ranking: RankingSettings,
    ) -> Self {
        Self {
            backend,
            settings,
            ranking,
        }
    }

    /// Resolve `query` to the best candidate.
    ///
    /// `Ok(None)` means the collaborator answered but nothing usable came
    /// back. `Err(SearchUnavailable)` means it could not be asked at all.
    pub async fn resolve(&self, query: &str) -> Result<Option<ScoredCandidate>, ConversionError> {
        let search_query = SearchQuery {
            text: query.to_string(),
            max_results: self.settings.max_results,
            max_duration_sec: self.settings.max_duration_sec,
        };
        let lines = self.backend.search(&search_query).await?;

        let mut candidates = Vec::with_capacity(lines.len());
        for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
            match parse_candidate(line) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => warn!("Skipping malformed search result for '{}': {}", query, e),
            }
        }
        debug!(
            "Search for '{}' returned {} usable candidates",
            query,
            candidates.len()
        );

        Ok(pick_best(candidates, &self.ranking))
    }
}
