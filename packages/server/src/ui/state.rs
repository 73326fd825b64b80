//! Server state shared by the handlers.

use std::sync::Arc;

use serde::Deserialize;

use crate::{coordinator::Coordinator, infrastructure::WebSocketTransport};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Display name of the connecting participant
    pub name: String,
}

/// Shared application state
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    /// The same transport the coordinator delivers through
    pub transport: WebSocketTransport,
}

impl AppState {
    pub fn new(coordinator: Arc<Coordinator>, transport: WebSocketTransport) -> Self {
        Self {
            coordinator,
            transport,
        }
    }
}
