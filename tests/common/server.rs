//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own media and scratch dirs.

use super::constants::*;
use super::fakes::{DownloadBehavior, FakeDownloadBackend, FakeSearchBackend};
use song_convert_server::conversion::{
    AudioFetcher, ConversionManager, FetchSettings, InMemoryJobStore, LocalMediaStorage,
    RankingSettings, SearchResolver, SearchSettings,
};
use song_convert_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with fake collaborators
///
/// When dropped, the server gracefully shuts down and temp dirs are removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    #[allow(dead_code)]
    pub port: u16,

    // Private fields - keep resources alive until drop
    media_dir: TempDir,
    scratch_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server whose downloads succeed.
    pub async fn spawn() -> Self {
        Self::spawn_with(DownloadBehavior::Succeed).await
    }

    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the port cannot be bound or the server does not become ready.
    pub async fn spawn_with(behavior: DownloadBehavior) -> Self {
        let media_dir = TempDir::new().expect("Failed to create media dir");
        let scratch_dir = TempDir::new().expect("Failed to create scratch dir");

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let manager = Arc::new(ConversionManager::new(
            Arc::new(InMemoryJobStore::new()),
            SearchResolver::new(
                Arc::new(FakeSearchBackend),
                SearchSettings::default(),
                RankingSettings::default(),
            ),
            AudioFetcher::new(
                Arc::new(FakeDownloadBackend { behavior }),
                FetchSettings {
                    timeout: Duration::from_millis(TEST_FETCH_TIMEOUT_MS),
                    ..FetchSettings::default()
                },
            ),
            Arc::new(LocalMediaStorage::new(media_dir.path(), base_url.clone())),
            scratch_dir.path().join("jobs"),
        ));

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            bind_address: "127.0.0.1".to_string(),
            port,
            media_dir: Some(media_dir.path().to_path_buf()),
        };
        let app = make_app(config, manager);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            media_dir,
            scratch_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    #[allow(dead_code)]
    pub fn media_path(&self) -> &Path {
        self.media_dir.path()
    }

    /// Root under which per-job scratch directories are created.
    #[allow(dead_code)]
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.path().join("jobs")
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDirs are cleaned up automatically
    }
}
