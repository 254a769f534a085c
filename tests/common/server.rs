//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own database and media files.

use super::constants::*;
use super::fixtures::{create_test_environment, library_xml};
use musync_server::library_store::{LibraryId, LibraryStore, SqliteLibraryStore};
use musync_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use musync_server::{import_library, ImportSummary, UserStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Store for direct database access in tests
    pub store: Arc<SqliteLibraryStore>,

    /// Directory holding the audio files referenced by [`library_xml`]
    pub media_dir: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the environment cannot be created or the server does not
    /// become ready within timeout.
    pub async fn spawn() -> Self {
        let (temp_dir, db_path, media_dir) =
            create_test_environment().expect("Failed to create test environment");

        let store = Arc::new(SqliteLibraryStore::new(&db_path, 2).expect("Failed to open store"));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };

        let app = make_app(config, store.clone(), store.clone()).expect("Failed to build app");

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
            store,
            media_dir,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Imports the fixture document for `user_handle` straight through the
    /// store, bypassing HTTP.
    pub fn import_fixture_library(&self, user_handle: &str) -> ImportSummary {
        let user_id = self
            .store
            .get_user_id(user_handle)
            .expect("Failed to look up user")
            .expect("Unknown test user");
        import_library(
            self.store.as_ref(),
            user_id,
            LIBRARY_NAME,
            library_xml(&self.media_dir).as_bytes(),
        )
        .expect("Failed to import fixture library")
    }

    pub fn library_ids(&self, user_handle: &str) -> Vec<LibraryId> {
        let user_id = self.store.get_user_id(user_handle).unwrap().unwrap();
        self.store
            .list_libraries(user_id)
            .unwrap()
            .into_iter()
            .map(|library| library.id)
            .collect()
    }

    /// Waits for the server to become ready by polling the /health endpoint
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

            match client.get(format!("{}/health", self.base_url)).send().await {
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
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
