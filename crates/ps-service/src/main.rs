use ps_service::actors::RoomActor;
use ps_service::config::Config;
use ps_service::observability::metrics;
use ps_service::routes::{self, AppState};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ps_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Proximity State service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");

    // Install the metrics recorder before anything records
    let metrics_handle = metrics::init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // Spawn the room actor that owns all shared state
    let cancel_token = CancellationToken::new();
    let (room, _room_task) =
        RoomActor::spawn(config.attenuation_policy, cancel_token.clone());

    // Parse bind address before moving config
    let bind_address = config.bind_address.clone();

    // Create application state
    let state = AppState::new(config, room).map_err(|e| {
        error!("Failed to build application state: {}", e);
        e.to_string()
    })?;

    // Build application routes
    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Proximity State service listening on {}", addr);

    // Start server with ConnectInfo support (the auth rate limiter keys on
    // the client IP)
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    cancel_token.cancel();

    Ok(())
}
