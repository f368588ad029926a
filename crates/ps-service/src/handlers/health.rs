//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks the room actor answers queries

use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
struct ReadinessResponse {
    status: &'static str,
    room_actor: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Liveness probe handler.
///
/// Does NOT check any dependencies - failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// The only local dependency is the room actor; a round trip through its
/// mailbox proves the state engine is serving. Returns 200 if ready, 503 if
/// not.
#[tracing::instrument(skip_all, name = "ps.health.readiness")]
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.room.connected_count().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                room_actor: "healthy",
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!("Readiness check failed: room actor unavailable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    room_actor: "unhealthy",
                    // Generic error - don't leak internals
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}
