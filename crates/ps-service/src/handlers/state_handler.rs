//! Pull-side state queries.
//!
//! Every endpoint here is a point-in-time read; absence of an id is a valid,
//! common state and yields an empty or zero-valued result, never an error.

use crate::errors::PsError;
use crate::models::{ConnectedResponse, ListenerState, StateSnapshot};
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use std::collections::HashMap;

/// Volumes of every other participant as heard by the caller.
///
/// GET /volumes/:user_id
pub async fn get_volumes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<HashMap<String, f64>>, PsError> {
    let volumes = state.room.volumes_for(user_id).await?;
    Ok(Json(volumes))
}

/// The caller's combined speaking + volumes state, one poll per tick.
///
/// GET /state/:user_id
///
/// Ids on this endpoint are platform user ids and therefore numeric; anything
/// else is a malformed request.
pub async fn get_listener_state(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ListenerState>, PsError> {
    if user_id.is_empty() || !user_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PsError::BadRequest("Invalid userId".to_string()));
    }

    let listener_state = state.room.listener_state(user_id).await?;
    Ok(Json(listener_state))
}

/// Full snapshot for every known participant — a single poll that scales to
/// room-sized player counts.
///
/// GET /state-all
pub async fn get_state_all(
    State(state): State<AppState>,
) -> Result<Json<StateSnapshot>, PsError> {
    let snapshot = state.room.state_all().await?;
    Ok(Json(snapshot))
}

/// Connected-set cardinality.
///
/// GET /connected
pub async fn get_connected(
    State(state): State<AppState>,
) -> Result<Json<ConnectedResponse>, PsError> {
    let count = state.room.connected_count().await?;
    Ok(Json(ConnectedResponse { count }))
}
