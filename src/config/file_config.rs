use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub logging_level: Option<String>,
    pub media_dir: Option<String>,
    pub scratch_dir: Option<String>,
    pub public_base_url: Option<String>,

    // Pipeline configs
    pub tools: Option<ToolsConfig>,
    pub search: Option<SearchConfig>,
    pub ranking: Option<RankingConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ToolsConfig {
    pub ytdlp_path: Option<String>,
    pub search_timeout_sec: Option<u64>,
    pub fetch_timeout_sec: Option<u64>,
    pub audio_format: Option<String>,
    pub audio_bitrate: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: Option<usize>,
    /// Candidates at least this long are filtered out by the search tool.
    pub max_duration_sec: Option<u64>,
}

/// Overrides for the match ranking heuristic. Windows are `[min, max]` in seconds.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RankingConfig {
    pub keywords: Option<Vec<String>>,
    pub channel_indicators: Option<Vec<String>>,
    pub ideal_window_sec: Option<[u64; 2]>,
    pub plausible_window_sec: Option<[u64; 2]>,
    pub high_view_threshold: Option<u64>,
    pub medium_view_threshold: Option<u64>,
    pub keyword_weight: Option<u32>,
    pub ideal_duration_weight: Option<u32>,
    pub plausible_duration_weight: Option<u32>,
    pub channel_weight: Option<u32>,
    pub high_view_weight: Option<u32>,
    pub medium_view_weight: Option<u32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
