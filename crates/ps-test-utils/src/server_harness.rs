//! Test server harness for E2E testing
//!
//! Provides `TestPsServer` for spawning real PS server instances in tests.

use ps_service::actors::RoomActor;
use ps_service::config::Config;
use ps_service::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Test harness for spawning the PS server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_connected_starts_empty() -> Result<(), anyhow::Error> {
///     let server = TestPsServer::spawn().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .get(format!("{}/connected", server.url()))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestPsServer {
    addr: SocketAddr,
    config: Config,
    cancel_token: CancellationToken,
    _handle: JoinHandle<()>,
}

impl TestPsServer {
    /// Spawn a test server with default configuration (no credential groups,
    /// no ingest secret).
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::new()).await
    }

    /// Spawn a test server from the given configuration variables.
    ///
    /// The server binds to a random available port and runs in the
    /// background until the harness is dropped.
    pub async fn spawn_with_vars(vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let cancel_token = CancellationToken::new();
        let (room, _room_task) =
            RoomActor::spawn(config.attenuation_policy, cancel_token.clone());

        let state = AppState::new(config.clone(), room)
            .map_err(|e| anyhow::anyhow!("Failed to build app state: {}", e))?;

        // A standalone recorder per server: the handle renders without
        // touching the process-global recorder, which tests must not install.
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let app = routes::build_routes(state, recorder.handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {e}");
            }
        });

        Ok(Self {
            addr,
            config,
            cancel_token,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the realtime channel URL of the test server.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestPsServer {
    fn drop(&mut self) {
        // Stop the room actor and the HTTP server as soon as the test ends.
        self.cancel_token.cancel();
        self._handle.abort();
    }
}
