use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use song_convert_server::config::{AppConfig, CliConfig, FileConfig};
use song_convert_server::conversion::{
    check_ytdlp_available, AudioFetcher, ConversionManager, FetchSettings, InMemoryJobStore,
    LocalMediaStorage, SearchResolver, YtDlpDownloadBackend, YtDlpSearchBackend,
};
use song_convert_server::server::{run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().context("Could not resolve the working directory")?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(about = "Turns song names into downloadable audio files")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// The address to bind to.
    #[clap(long, default_value = "127.0.0.1")]
    pub bind_address: String,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Directory where converted files are published and served from.
    #[clap(long, value_parser = parse_path)]
    pub media_dir: Option<PathBuf>,

    /// Root for per-job scratch directories. Defaults to the system temp dir.
    #[clap(long, value_parser = parse_path)]
    pub scratch_dir: Option<PathBuf>,

    /// Prefix of the download links handed back to callers.
    #[clap(long)]
    pub public_base_url: Option<String>,

    /// Path to the yt-dlp executable.
    #[clap(long)]
    pub ytdlp_path: Option<String>,

    /// Upper bound in seconds for a single download.
    #[clap(long)]
    pub fetch_timeout_sec: Option<u64>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            port: self.port,
            bind_address: self.bind_address.clone(),
            logging_level: self.logging_level.clone(),
            media_dir: self.media_dir.clone(),
            scratch_dir: self.scratch_dir.clone(),
            public_base_url: self.public_base_url.clone(),
            ytdlp_path: self.ytdlp_path.clone(),
            fetch_timeout_sec: self.fetch_timeout_sec,
        }
    }
}

fn build_conversion_manager(config: &AppConfig) -> Arc<ConversionManager> {
    let search_backend = Arc::new(YtDlpSearchBackend::new(
        config.tools.ytdlp_path.clone(),
        config.tools.search_timeout(),
    ));
    let download_backend = Arc::new(YtDlpDownloadBackend::new(config.tools.ytdlp_path.clone()));
    let storage = Arc::new(LocalMediaStorage::new(
        config.media_dir.clone(),
        config.public_base_url.clone(),
    ));

    Arc::new(ConversionManager::new(
        Arc::new(InMemoryJobStore::new()),
        SearchResolver::new(search_backend, config.search.clone(), config.ranking.clone()),
        AudioFetcher::new(
            download_backend,
            FetchSettings {
                audio_format: config.tools.audio_format.clone(),
                audio_bitrate: config.tools.audio_bitrate.clone(),
                timeout: config.tools.fetch_timeout(),
            },
        ),
        storage,
        config.scratch_dir.clone(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    std::fs::create_dir_all(&config.media_dir)
        .with_context(|| format!("Failed to create media directory {:?}", config.media_dir))?;

    match check_ytdlp_available(&config.tools.ytdlp_path).await {
        Ok(version) => info!("Using {} {}", config.tools.ytdlp_path, version),
        Err(e) => warn!("{} is not usable, conversions will fail: {}", config.tools.ytdlp_path, e),
    }

    info!(
        "Media dir {:?}, scratch dir {:?}, links under {}",
        config.media_dir, config.scratch_dir, config.public_base_url
    );

    let conversion_manager = build_conversion_manager(&config);
    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        bind_address: config.bind_address.clone(),
        port: config.port,
        media_dir: Some(config.media_dir.clone()),
    };

    run_server(server_config, conversion_manager).await
}
