//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own user store.

use super::constants::*;
use music_lister_server::server::state::GuardedUserStore;
use music_lister_server::{
    make_app, Backend, InMemoryUserStore, RequestsLoggingLevel, ServerConfig, SqliteUserStore,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated store
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// User store for direct access in tests
    pub user_store: GuardedUserStore,

    // Private fields - keep resources alive until drop
    _temp_db_dir: Option<TempDir>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the store cannot be created, the port cannot be bound or the
    /// server doesn't become ready within the timeout.
    pub async fn spawn(backend: Backend) -> Self {
        let temp_db_dir = match backend {
            Backend::Memory => None,
            Backend::Sqlite => Some(TempDir::new().expect("Failed to create temp dir")),
        };
        let user_store: GuardedUserStore = match &temp_db_dir {
            None => Arc::new(InMemoryUserStore::default()),
            Some(temp_dir) => Arc::new(
                SqliteUserStore::new(temp_dir.path().join("music.db"))
                    .expect("Failed to open user store"),
            ),
        };

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
            requests_logging_level: RequestsLoggingLevel::None,
            bind_address: "127.0.0.1".to_owned(),
            port,
            frontend_dir_path: None,
        };
        let app = make_app(config, user_store.clone());

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
            user_store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the stats endpoint
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
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
