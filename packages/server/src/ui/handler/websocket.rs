//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};

use crate::{
    domain::{DisplayName, Participant},
    ui::state::{AppState, ConnectQuery},
    usecase::CoordinatorError,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> DisplayName (Domain Model)
    let display_name = match DisplayName::try_from(query.name.clone()) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!("Invalid display name '{}': {}", query.name, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let participant = match state.coordinator.register_participant(display_name).await {
        Ok(participant) => participant,
        Err(CoordinatorError::ServerFull { max }) => {
            tracing::warn!(
                "Server is full ({} participants). Rejecting '{}'",
                max,
                query.name
            );
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
        Err(e) => {
            tracing::error!("Failed to register '{}': {}", query.name, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let failed_state = state.clone();
    let participant_id = participant.id;
    Ok(ws
        .on_failed_upgrade(move |e| {
            tracing::warn!("WebSocket upgrade for {} failed: {}", participant_id, e);
            tokio::spawn(async move {
                failed_state.coordinator.on_disconnect(participant_id).await;
            });
        })
        .on_upgrade(move |socket| handle_socket(socket, state, participant)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, participant: Participant) {
    // Register the outbound channel before greeting so the welcome is queued first
    let mut rx = state.transport.register(participant.id).await;
    state.coordinator.welcome(&participant).await;
    let participant = participant.id;

    let (mut sender, mut receiver) = socket.split();

    let state_clone = state.clone();

    // Spawn a task to receive messages from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            let payload = match msg {
                Message::Text(text) => text.as_str().as_bytes().to_vec(),
                Message::Binary(bytes) => bytes.to_vec(),
                Message::Ping(_) | Message::Pong(_) => {
                    // Pong replies are sent automatically; control frames still count as liveness
                    if let Err(e) = state_clone.coordinator.heartbeat(participant).await {
                        tracing::debug!("Heartbeat from {} ignored: {}", participant, e);
                    }
                    continue;
                }
                Message::Close(_) => {
                    tracing::info!("Participant {} requested close", participant);
                    break;
                }
                _ => continue,
            };

            // Rejections are answered with a `rejected` message by the coordinator
            if let Err(e) = state_clone
                .coordinator
                .handle_message(participant, &payload)
                .await
            {
                tracing::debug!("Message from {} rejected: {}", participant, e);
            }
        }
    });

    // Spawn a task to forward queued payloads to this client
    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            let message = match String::from_utf8(payload) {
                Ok(text) => Message::Text(text.into()),
                Err(e) => Message::Binary(e.into_bytes().into()),
            };
            if sender.send(message).await.is_err() {
                return;
            }
        }
        // The transport dropped the channel, e.g. after a liveness timeout
        let _ = sender.send(Message::Close(None)).await;
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.transport.unregister(participant).await;
    state.coordinator.on_disconnect(participant).await;
    tracing::info!("Participant {} disconnected", participant);
}
