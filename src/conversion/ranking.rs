//! Best-match ranking of search candidates.
//!
//! Scoring is additive and deterministic. The thresholds are heuristic tuning
//! values; they live in [`RankingSettings`] so they can be overridden from the
//! config file, but the defaults are the ones the tie-break tests rely on.

use serde::{Deserialize, Serialize};

use super::models::{ScoredCandidate, SearchCandidate};

/// Inclusive duration range, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationWindow {
    pub min_sec: u64,
    pub max_sec: u64,
}

impl DurationWindow {
    pub const fn new(min_sec: u64, max_sec: u64) -> Self {
        Self { min_sec, max_sec }
    }

    pub fn contains(&self, seconds: u64) -> bool {
        (self.min_sec..=self.max_sec).contains(&seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingSettings {
    /// Music-indicative words looked up in the lower-cased title.
    pub keywords: Vec<String>,
    /// Publisher name fragments typical of artist or label channels.
    pub channel_indicators: Vec<String>,
    pub ideal_window: DurationWindow,
    pub plausible_window: DurationWindow,
    pub high_view_threshold: u64,
    pub medium_view_threshold: u64,
    pub keyword_weight: u32,
    pub ideal_duration_weight: u32,
    pub plausible_duration_weight: u32,
    pub channel_weight: u32,
    pub high_view_weight: u32,
    pub medium_view_weight: u32,
}

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "official", "mv", "audio", "lyrics", "full", "cover", "公式", "歌詞", "フル", "カバー",
];
pub const DEFAULT_CHANNEL_INDICATORS: &[&str] = &["topic", "vevo", "records"];

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            channel_indicators: DEFAULT_CHANNEL_INDICATORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ideal_window: DurationWindow::new(120, 480),
            plausible_window: DurationWindow::new(60, 600),
            high_view_threshold: 1_000_000,
            medium_view_threshold: 100_000,
            keyword_weight: 2,
            ideal_duration_weight: 3,
            plausible_duration_weight: 1,
            channel_weight: 1,
            high_view_weight: 2,
            medium_view_weight: 1,
        }
    }
}

/// Score a single candidate. Higher is better, never negative.
pub fn score_candidate(candidate: &SearchCandidate, settings: &RankingSettings) -> u32 {
    let title = candidate.title.to_lowercase();
    let keyword_hits = settings
        .keywords
        .iter()
        .filter(|k| !k.is_empty() && title.contains(&k.to_lowercase()))
        .count() as u32;
    let mut score = keyword_hits * settings.keyword_weight;

    let duration = candidate.duration_seconds;
    if settings.ideal_window.contains(duration) {
        score += settings.ideal_duration_weight;
    } else if settings.plausible_window.contains(duration) {
        score += settings.plausible_duration_weight;
    }

    let publisher = candidate.publisher_name.to_lowercase();
    if settings
        .channel_indicators
        .iter()
        .any(|i| !i.is_empty() && publisher.contains(&i.to_lowercase()))
    {
        score += settings.channel_weight;
    }

    if candidate.view_count > settings.high_view_threshold {
        score += settings.high_view_weight;
    } else if candidate.view_count > settings.medium_view_threshold {
        score += settings.medium_view_weight;
    }

    score
}

/// Score all candidates and sort them by descending score.
///
/// The sort is stable: among equal scores the input order is kept, so the
/// first of several equally good candidates always wins.
pub fn rank_candidates(
    candidates: Vec<SearchCandidate>,
    settings: &RankingSettings,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let score = score_candidate(&candidate, settings);
            ScoredCandidate { candidate, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// The best candidate, or `None` for an empty input.
pub fn pick_best(
    candidates: Vec<SearchCandidate>,
    settings: &RankingSettings,
) -> Option<ScoredCandidate> {
    rank_candidates(candidates, settings).into_iter().next()
}
