//! Voice-session issuance against a directly presented identity.
//!
//! The game client posts its platform user id; the id is verified against
//! the external identity provider, and a voice credential for the configured
//! room is minted and returned. Rate limited per client IP because every
//! call can cost an upstream lookup.

use crate::errors::PsError;
use crate::models::{AuthRequest, VoiceSessionResponse};
use crate::observability::metrics;
use crate::routes::AppState;
use crate::services::voice_token;
use axum::{
    extract::{ConnectInfo, State},
    Json,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{info, instrument};

/// Handle a voice-session request.
///
/// POST /auth
#[instrument(
    skip_all,
    name = "ps.auth.token",
    fields(method = "POST", endpoint = "/auth")
)]
pub async fn issue_voice_session(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: axum::body::Bytes,
) -> Result<Json<VoiceSessionResponse>, PsError> {
    // Deserialize manually to return 400 (not Axum's default 422)
    let request: AuthRequest = serde_json::from_slice(&body)
        .map_err(|_| PsError::BadRequest("userId is required".to_string()))?;

    if request.user_id.is_empty() {
        return Err(PsError::BadRequest("userId is required".to_string()));
    }

    if !state.auth_limiter.check(&addr.ip().to_string()).await {
        return Err(PsError::RateLimitExceeded);
    }

    let identity_client = state
        .identity_client
        .as_ref()
        .ok_or(PsError::MissingConfig("identity provider"))?;
    let voice = state
        .config
        .voice
        .as_ref()
        .ok_or(PsError::MissingConfig("voice issuer"))?;

    let start = Instant::now();
    let profile = identity_client.verify_user(&request.user_id).await;
    metrics::record_upstream_request("auth", profile.is_some(), start.elapsed());

    let profile = profile.ok_or(PsError::InvalidIdentity)?;
    let username = profile.name.unwrap_or_else(|| "Guest".to_string());

    let token = voice_token::mint_voice_token(voice, &request.user_id, &username)?;

    info!(
        target: "ps.handlers.auth",
        user_id = %request.user_id,
        "Voice session issued"
    );

    Ok(Json(VoiceSessionResponse {
        token,
        url: voice.url.clone(),
        username,
    }))
}
