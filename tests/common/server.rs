//! Test server lifecycle management
//!
//! Spawns the real axum app on a random port against a temporary database.
//! When dropped, the server shuts down and temp resources are cleaned up.

use super::fixtures::create_test_db;
use sharedmelody_server::schema::VERSIONED_SCHEMAS;
use sharedmelody_server::server::server::make_app;
use sharedmelody_server::server::ServerConfig;
use sharedmelody_server::{
    Database, SqliteFavoritesStore, SqliteSongStore, SqliteUserStore,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Direct store access for seeding extra data in tests
    pub song_store: Arc<SqliteSongStore>,
    pub favorites_store: Arc<SqliteFavoritesStore>,
    pub user_store: Arc<SqliteUserStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port, backed by a fresh
    /// database populated by the standard fixture.
    ///
    /// # Panics
    ///
    /// Panics if database creation, port binding or server startup fails.
    pub async fn spawn() -> Self {
        let (temp_db_dir, db_path) = create_test_db().expect("Failed to create test database");

        let db = Database::open(&db_path, VERSIONED_SCHEMAS).expect("Failed to open test database");
        let song_store = Arc::new(SqliteSongStore::new(db.clone()));
        let favorites_store = Arc::new(SqliteFavoritesStore::new(db.clone()));
        let user_store = Arc::new(SqliteUserStore::new(db));

        let app = make_app(
            ServerConfig::default(),
            song_store.clone(),
            favorites_store.clone(),
            user_store.clone(),
        )
        .expect("Failed to build app");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener.local_addr().expect("Failed to read local addr").port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Test server failed");
        });

        // Give the accept loop a moment before the first request
        tokio::time::sleep(Duration::from_millis(20)).await;

        TestServer {
            base_url,
            port,
            song_store,
            favorites_store,
            user_store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        }
    }
}
