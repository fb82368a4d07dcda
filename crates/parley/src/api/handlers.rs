//! HTTP handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use parley_protocol::RoomName;
use serde::Serialize;

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: usize,
    pub rooms: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        connections: state.hub.connection_count().await,
        rooms: state.hub.room_count().await,
    })
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub room: String,
    pub members: usize,
}

/// GET /rooms/{room}
///
/// Reports the member count only; member ids stay private.
pub async fn get_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> ApiResult<Json<RoomResponse>> {
    let room = RoomName::parse(&room).ok_or_else(|| ApiError::bad_request("room name is empty"))?;
    let members = state
        .hub
        .room_size(room.as_str())
        .await
        .ok_or_else(|| ApiError::not_found(format!("room {}", room)))?;

    Ok(Json(RoomResponse {
        room: room.to_string(),
        members,
    }))
}
