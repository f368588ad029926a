//! Ingestion handlers: the trusted position channel and the self-reported
//! speaking channel.
//!
//! `POST /position` is the authoritative spatial feed from the game server.
//! When a shared secret is configured the caller must present it as a bearer
//! credential; comparison is constant-time and a mismatch rejects with 403
//! before any state mutation. `POST /speaking` is self-reported by the
//! owning client and carries no secret.

use crate::errors::PsError;
use crate::models::{PositionReport, SpeakingReport, SpeakingResponse, SuccessResponse};
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use common::secret::verify_shared_secret;

/// Handle a trusted position report.
///
/// POST /position
#[tracing::instrument(skip_all, name = "ps.ingest.position")]
pub async fn report_position(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<SuccessResponse>, PsError> {
    // Deserialize manually to return 400 (not Axum's default 422)
    let report: PositionReport = serde_json::from_slice(&body)
        .map_err(|_| PsError::BadRequest("userId is required".to_string()))?;

    if report.user_id.is_empty() {
        return Err(PsError::BadRequest("userId is required".to_string()));
    }

    // The secret gate runs before any mutation.
    if let Some(expected) = &state.config.ingest_secret {
        let presented = bearer_token(&headers).ok_or(PsError::Forbidden)?;
        if !verify_shared_secret(expected, presented) {
            tracing::warn!(
                target: "ps.handlers.ingest",
                "Position report rejected: invalid ingest secret"
            );
            return Err(PsError::Forbidden);
        }
    }

    state
        .room
        .report_position(report.user_id.clone(), report.position(), report.mode)
        .await?;

    Ok(Json(SuccessResponse::ok()))
}

/// Handle a self-reported speaking update.
///
/// POST /speaking
#[tracing::instrument(skip_all, name = "ps.ingest.speaking")]
pub async fn report_speaking(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Json<SuccessResponse>, PsError> {
    let report: SpeakingReport = serde_json::from_slice(&body)
        .map_err(|_| PsError::BadRequest("userId is required".to_string()))?;

    if report.user_id.is_empty() {
        return Err(PsError::BadRequest("userId is required".to_string()));
    }

    state
        .room
        .report_speaking(report.user_id, report.speaking)
        .await?;

    Ok(Json(SuccessResponse::ok()))
}

/// Read a participant's speaking flag. Unknown ids read as not speaking.
///
/// GET /speaking/:user_id
pub async fn get_speaking(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<SpeakingResponse>, PsError> {
    let speaking = state.room.speaking_state(user_id).await?;
    Ok(Json(SpeakingResponse { speaking }))
}

/// Extract a bearer credential from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer shhh"),
        );
        assert_eq!(bearer_token(&headers), Some("shhh"));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic shhh"),
        );
        assert_eq!(bearer_token(&headers), None);
    }
}
