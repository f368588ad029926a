//! HTTP routes for the PS service.
//!
//! Defines the Axum router and application state.

use crate::actors::RoomHandle;
use crate::config::Config;
use crate::errors::PsError;
use crate::handlers;
use crate::services::{FixedWindowLimiter, IdentityClient, OAuthClient};
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
///
/// Clone is cheap: the handle and clients are reference-counted, and the
/// signed-cookie jar requires `Key: FromRef<AppState>`, which keeps the
/// state itself the router's state type.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Handle to the room actor that owns all mutable state.
    pub room: RoomHandle,

    /// Signing key for the staged-session cookie jar.
    pub cookie_key: Key,

    /// Fixed-window limiter for the credential-issuing endpoint.
    pub auth_limiter: Arc<FixedWindowLimiter>,

    /// Identity-provider client, present when configured.
    pub identity_client: Option<Arc<IdentityClient>>,

    /// OAuth client for the handoff flow, present when configured.
    pub oauth_client: Option<Arc<OAuthClient>>,
}

impl AppState {
    /// Assemble application state from configuration and the room handle.
    pub fn new(config: Config, room: RoomHandle) -> Result<Self, PsError> {
        // Key length is validated at config load; >= 64 bytes always holds.
        let cookie_key = Key::from(&config.session_cookie_key);

        let auth_limiter = Arc::new(FixedWindowLimiter::new(
            config.auth_rate_limit_max,
            Duration::from_secs(config.auth_rate_limit_window_seconds),
        ));

        let identity_client = config
            .identity
            .clone()
            .map(|identity| IdentityClient::new(identity).map(Arc::new))
            .transpose()?;

        let oauth_client = config
            .oauth
            .clone()
            .map(|oauth| OAuthClient::new(oauth).map(Arc::new))
            .transpose()?;

        Ok(Self {
            config,
            room,
            cookie_key,
            auth_limiter,
            identity_client,
            oauth_client,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.cookie_key.clone()
    }
}

/// Build the application routes.
///
/// - `/health`, `/ready` - probes
/// - `/metrics` - Prometheus endpoint (own state)
/// - `/auth` - direct voice-session issuance (rate limited per IP)
/// - `/position`, `/speaking` - ingestion
/// - `/speaking/:user_id`, `/volumes/:user_id`, `/state/:user_id`,
///   `/state-all`, `/connected` - pull-side queries
/// - `/login`, `/oauth/callback`, `/auth/session` - session handoff
/// - `/ws` - realtime channel
/// - TraceLayer for request logging, 30 second request timeout
pub fn build_routes(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/auth", post(handlers::issue_voice_session))
        .route("/position", post(handlers::report_position))
        .route("/speaking", post(handlers::report_speaking))
        .route("/speaking/:user_id", get(handlers::get_speaking))
        .route("/volumes/:user_id", get(handlers::get_volumes))
        .route("/state/:user_id", get(handlers::get_listener_state))
        .route("/state-all", get(handlers::get_state_all))
        .route("/connected", get(handlers::get_connected))
        .route("/login", get(handlers::login))
        .route("/oauth/callback", get(handlers::oauth_callback))
        .route("/auth/session", get(handlers::claim_session))
        .route("/ws", get(handlers::ws_upgrade))
        .with_state(state)
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
