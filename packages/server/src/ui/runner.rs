//! Server bootstrap: router construction and the serve loop.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerArgs,
    coordinator::Coordinator,
    error::ServerError,
    infrastructure::WebSocketTransport,
    ui::{
        handler::{get_room_detail, get_room_messages, get_rooms, health_check, websocket_handler},
        signal::shutdown_signal,
        state::AppState,
    },
};

/// Build the HTTP + WebSocket router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/rooms", get(get_rooms))
        .route("/api/rooms/{name}", get(get_room_detail))
        .route("/api/rooms/{name}/messages", get(get_room_messages))
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server until Ctrl+C.
pub async fn run(args: ServerArgs) -> Result<(), ServerError> {
    let addr = args
        .socket_addr()
        .map_err(|source| ServerError::InvalidAddress {
            addr: args.addr(),
            source,
        })?;

    let transport = WebSocketTransport::new();
    let coordinator = Arc::new(Coordinator::new(
        args.coordinator_config(),
        Arc::new(transport.clone()),
    ));

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    tracing::info!("Readyroom server listening on {}", addr);
    tracing::info!("WebSocket endpoint: ws://{}/ws?name=<display name>", addr);

    serve_with_listener(listener, coordinator, transport, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// The background sweeper runs for as long as the server does.
pub async fn serve_with_listener<F>(
    listener: TcpListener,
    coordinator: Arc<Coordinator>,
    transport: WebSocketTransport,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sweeper = coordinator.spawn_sweeper();
    let state = Arc::new(AppState::new(coordinator, transport));
    let app = build_router(state);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    sweeper.abort();
    result.map_err(ServerError::from)
}
