mod file_config;

pub use file_config::{FileConfig, RankingConfig, SearchConfig, ToolsConfig};

use crate::conversion::{DurationWindow, RankingSettings, SearchSettings, DEFAULT_YTDLP_PROGRAM};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub port: u16,
    pub bind_address: String,
    pub logging_level: RequestsLoggingLevel,
    pub media_dir: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub public_base_url: Option<String>,
    pub ytdlp_path: Option<String>,
    pub fetch_timeout_sec: Option<u64>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "127.0.0.1".to_string(),
            logging_level: RequestsLoggingLevel::Path,
            media_dir: None,
            scratch_dir: None,
            public_base_url: None,
            ytdlp_path: None,
            fetch_timeout_sec: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub port: u16,
    pub bind_address: String,
    pub logging_level: RequestsLoggingLevel,
    pub media_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub public_base_url: String,

    // Pipeline settings (with defaults)
    pub tools: ToolSettings,
    pub search: SearchSettings,
    pub ranking: RankingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub ytdlp_path: String,
    pub search_timeout_sec: u64,
    pub fetch_timeout_sec: u64,
    pub audio_format: String,
    pub audio_bitrate: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ytdlp_path: DEFAULT_YTDLP_PROGRAM.to_string(),
            search_timeout_sec: 30,
            fetch_timeout_sec: 300,
            audio_format: "mp3".to_string(),
            audio_bitrate: "192K".to_string(),
        }
    }
}

impl ToolSettings {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_sec)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_sec)
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let bind_address = file
            .bind_address
            .unwrap_or_else(|| cli.bind_address.clone());

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let media_dir = file
            .media_dir
            .map(PathBuf::from)
            .or_else(|| cli.media_dir.clone())
            .unwrap_or_else(|| PathBuf::from("./media"));
        if media_dir.exists() && !media_dir.is_dir() {
            bail!("media_dir is not a directory: {:?}", media_dir);
        }

        let scratch_dir = file
            .scratch_dir
            .map(PathBuf::from)
            .or_else(|| cli.scratch_dir.clone())
            .unwrap_or_else(std::env::temp_dir);
        if scratch_dir.exists() && !scratch_dir.is_dir() {
            bail!("scratch_dir is not a directory: {:?}", scratch_dir);
        }

        let public_base_url = file
            .public_base_url
            .or_else(|| cli.public_base_url.clone())
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();
        if !public_base_url.starts_with("http://") && !public_base_url.starts_with("https://") {
            bail!("public_base_url must be an http(s) URL: {}", public_base_url);
        }

        // Tool settings - merge file config with CLI and defaults
        let defaults = ToolSettings::default();
        let tools_file = file.tools.unwrap_or_default();
        let tools = ToolSettings {
            ytdlp_path: tools_file
                .ytdlp_path
                .or_else(|| cli.ytdlp_path.clone())
                .unwrap_or(defaults.ytdlp_path),
            search_timeout_sec: tools_file
                .search_timeout_sec
                .unwrap_or(defaults.search_timeout_sec),
            fetch_timeout_sec: tools_file
                .fetch_timeout_sec
                .or(cli.fetch_timeout_sec)
                .unwrap_or(defaults.fetch_timeout_sec),
            audio_format: tools_file.audio_format.unwrap_or(defaults.audio_format),
            audio_bitrate: tools_file.audio_bitrate.unwrap_or(defaults.audio_bitrate),
        };
        if tools.fetch_timeout_sec == 0 {
            bail!("fetch_timeout_sec must be greater than 0");
        }
        if tools.search_timeout_sec == 0 {
            bail!("search_timeout_sec must be greater than 0");
        }
        if tools.audio_format.is_empty()
            || !tools.audio_format.chars().all(|c| c.is_ascii_alphanumeric())
        {
            bail!("audio_format must be a plain extension, got {:?}", tools.audio_format);
        }

        let search_file = file.search.unwrap_or_default();
        let search_defaults = SearchSettings::default();
        let search = SearchSettings {
            max_results: search_file
                .max_results
                .unwrap_or(search_defaults.max_results),
            max_duration_sec: search_file
                .max_duration_sec
                .unwrap_or(search_defaults.max_duration_sec),
        };
        if search.max_results == 0 {
            bail!("search.max_results must be greater than 0");
        }

        let ranking = resolve_ranking(file.ranking.unwrap_or_default())?;

        Ok(Self {
            port,
            bind_address,
            logging_level,
            media_dir,
            scratch_dir,
            public_base_url,
            tools,
            search,
            ranking,
        })
    }
}

fn resolve_window(value: Option<[u64; 2]>, default: DurationWindow, name: &str) -> Result<DurationWindow> {
    match value {
        None => Ok(default),
        Some([min_sec, max_sec]) if min_sec <= max_sec => Ok(DurationWindow::new(min_sec, max_sec)),
        Some([min_sec, max_sec]) => bail!(
            "ranking.{} is inverted: [{}, {}]",
            name,
            min_sec,
            max_sec
        ),
    }
}

fn resolve_ranking(file: RankingConfig) -> Result<RankingSettings> {
    let defaults = RankingSettings::default();
    let ranking = RankingSettings {
        keywords: file.keywords.unwrap_or(defaults.keywords),
        channel_indicators: file
            .channel_indicators
            .unwrap_or(defaults.channel_indicators),
        ideal_window: resolve_window(file.ideal_window_sec, defaults.ideal_window, "ideal_window_sec")?,
        plausible_window: resolve_window(
            file.plausible_window_sec,
            defaults.plausible_window,
            "plausible_window_sec",
        )?,
        high_view_threshold: file
            .high_view_threshold
            .unwrap_or(defaults.high_view_threshold),
        medium_view_threshold: file
            .medium_view_threshold
            .unwrap_or(defaults.medium_view_threshold),
        keyword_weight: file.keyword_weight.unwrap_or(defaults.keyword_weight),
        ideal_duration_weight: file
            .ideal_duration_weight
            .unwrap_or(defaults.ideal_duration_weight),
        plausible_duration_weight: file
            .plausible_duration_weight
            .unwrap_or(defaults.plausible_duration_weight),
        channel_weight: file.channel_weight.unwrap_or(defaults.channel_weight),
        high_view_weight: file.high_view_weight.unwrap_or(defaults.high_view_weight),
        medium_view_weight: file
            .medium_view_weight
            .unwrap_or(defaults.medium_view_weight),
    };
    if ranking.medium_view_threshold > ranking.high_view_threshold {
        bail!("ranking.medium_view_threshold must not exceed high_view_threshold");
    }
    Ok(ranking)
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("body"),
            Some(RequestsLoggingLevel::Body)
        ));
        // Case insensitive
        assert!(matches!(
            parse_logging_level("PATH"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&CliConfig::default(), None).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.logging_level, RequestsLoggingLevel::Path);
        assert_eq!(config.media_dir, PathBuf::from("./media"));
        assert_eq!(config.scratch_dir, std::env::temp_dir());
        assert_eq!(config.public_base_url, "http://localhost:5000");
        assert_eq!(config.tools, ToolSettings::default());
        assert_eq!(config.tools.fetch_timeout(), Duration::from_secs(300));
        assert_eq!(config.search, SearchSettings::default());
        assert_eq!(config.ranking, RankingSettings::default());
    }

    #[test]
    fn test_resolve_cli_only() {
        let media = TempDir::new().unwrap();
        let cli = CliConfig {
            port: 6000,
            bind_address: "0.0.0.0".to_string(),
            logging_level: RequestsLoggingLevel::Headers,
            media_dir: Some(media.path().to_path_buf()),
            scratch_dir: None,
            public_base_url: Some("https://songs.example.com/".to_string()),
            ytdlp_path: Some("/opt/yt-dlp".to_string()),
            fetch_timeout_sec: Some(60),
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.port, 6000);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.media_dir, media.path());
        assert_eq!(config.public_base_url, "https://songs.example.com");
        assert_eq!(config.tools.ytdlp_path, "/opt/yt-dlp");
        assert_eq!(config.tools.fetch_timeout_sec, 60);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let cli = CliConfig {
            port: 6000,
            fetch_timeout_sec: Some(60),
            ytdlp_path: Some("/cli/yt-dlp".to_string()),
            ..Default::default()
        };
        let file_config = FileConfig {
            port: Some(7000),
            logging_level: Some("body".to_string()),
            tools: Some(ToolsConfig {
                fetch_timeout_sec: Some(90),
                audio_format: Some("m4a".to_string()),
                ..Default::default()
            }),
            search: Some(SearchConfig {
                max_results: Some(5),
                max_duration_sec: None,
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.port, 7000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert_eq!(config.tools.fetch_timeout_sec, 90);
        assert_eq!(config.tools.audio_format, "m4a");
        assert_eq!(config.search.max_results, 5);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.tools.ytdlp_path, "/cli/yt-dlp");
        assert_eq!(config.search.max_duration_sec, 600);
        // Derived from the resolved port
        assert_eq!(config.public_base_url, "http://localhost:7000");
    }

    #[test]
    fn test_resolve_ranking_overrides() {
        let file_config = FileConfig {
            ranking: Some(RankingConfig {
                keywords: Some(vec!["live".to_string()]),
                ideal_window_sec: Some([150, 400]),
                keyword_weight: Some(4),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&CliConfig::default(), Some(file_config)).unwrap();

        assert_eq!(config.ranking.keywords, vec!["live".to_string()]);
        assert_eq!(config.ranking.ideal_window, DurationWindow::new(150, 400));
        assert_eq!(config.ranking.keyword_weight, 4);
        assert_eq!(
            config.ranking.plausible_window,
            RankingSettings::default().plausible_window
        );
    }

    #[test]
    fn test_resolve_rejects_zero_fetch_timeout() {
        let cli = CliConfig {
            fetch_timeout_sec: Some(0),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("fetch_timeout_sec"));
    }

    #[test]
    fn test_resolve_rejects_zero_max_results() {
        let file_config = FileConfig {
            search: Some(SearchConfig {
                max_results: Some(0),
                max_duration_sec: None,
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&CliConfig::default(), Some(file_config)).is_err());
    }

    #[test]
    fn test_resolve_rejects_inverted_window() {
        let file_config = FileConfig {
            ranking: Some(RankingConfig {
                plausible_window_sec: Some([600, 60]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = AppConfig::resolve(&CliConfig::default(), Some(file_config));
        assert!(result.unwrap_err().to_string().contains("inverted"));
    }

    #[test]
    fn test_resolve_media_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            media_dir: Some(temp_file.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_rejects_non_http_base_url() {
        let cli = CliConfig {
            public_base_url: Some("ftp://example.com".to_string()),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }
}
