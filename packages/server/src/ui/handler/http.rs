//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{RoomError, RoomName},
    infrastructure::dto::http::{ChatMessageDto, RoomDetailDto, RoomSummaryDto},
    ui::state::AppState,
    usecase::CoordinatorError,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.coordinator.list_rooms().await;
    Json(rooms.into_iter().map(Into::into).collect())
}

/// Get room detail by name
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let name = parse_room_name(name)?;
    let snapshot = state
        .coordinator
        .room_snapshot(&name)
        .await
        .map_err(status_code)?;
    Ok(Json(snapshot.into()))
}

/// Get the retained chat history of a room
pub async fn get_room_messages(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<ChatMessageDto>>, StatusCode> {
    let name = parse_room_name(name)?;
    let history = state
        .coordinator
        .history(&name)
        .await
        .map_err(status_code)?;
    Ok(Json(ChatMessageDto::from_history(history)))
}

fn parse_room_name(name: String) -> Result<RoomName, StatusCode> {
    RoomName::new(name).map_err(|e| {
        tracing::warn!("Invalid room name: {}", e);
        StatusCode::BAD_REQUEST
    })
}

fn status_code(error: CoordinatorError) -> StatusCode {
    match error {
        CoordinatorError::Room(RoomError::NotFound(_)) => StatusCode::NOT_FOUND,
        CoordinatorError::Room(_) => StatusCode::CONFLICT,
        CoordinatorError::ServerFull { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CoordinatorError::UnknownParticipant(_) => StatusCode::NOT_FOUND,
        CoordinatorError::Invalid(_) | CoordinatorError::Malformed(_) => StatusCode::BAD_REQUEST,
    }
}
