//! Test fixtures for integration tests.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use readyroom_server::{
    Coordinator, CoordinatorConfig, infrastructure::WebSocketTransport, ui::serve_with_listener,
};
use tokio::{net::TcpListener, sync::oneshot};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// In-process server bound to an ephemeral port
///
/// The server stops when the fixture is dropped.
pub struct TestServer {
    addr: SocketAddr,
    coordinator: Arc<Coordinator>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a server with empty rooms kept alive long enough for the test
    pub async fn start() -> Self {
        Self::start_with(CoordinatorConfig {
            empty_room_ttl: Duration::from_secs(60),
            ..CoordinatorConfig::default()
        })
        .await
    }

    pub async fn start_with(config: CoordinatorConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let transport = WebSocketTransport::new();
        let coordinator = Arc::new(Coordinator::new(config, Arc::new(transport.clone())));
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(serve_with_listener(
            listener,
            coordinator.clone(),
            transport,
            async move {
                let _ = rx.await;
            },
        ));

        Self {
            addr,
            coordinator,
            shutdown: Some(tx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, name: &str) -> String {
        format!("ws://{}/ws?name={}", self.addr, name)
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A connected WebSocket client speaking JSON
pub struct TestClient {
    stream: WsStream,
}

impl TestClient {
    pub async fn connect(server: &TestServer, name: &str) -> Self {
        let (stream, _) = connect_async(server.ws_url(name))
            .await
            .expect("Failed to connect");
        Self { stream }
    }

    pub async fn send(&mut self, value: serde_json::Value) {
        self.stream
            .send(Message::Text(value.to_string().into()))
            .await
            .expect("Failed to send message");
    }

    /// Receive the next JSON message, failing after 2 seconds
    pub async fn recv(&mut self) -> serde_json::Value {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(2), self.stream.next())
                .await
                .expect("Timed out waiting for a message")
                .expect("Stream closed")
                .expect("WebSocket error");
            match message {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str()).expect("Invalid JSON");
                }
                Message::Binary(bytes) => {
                    return serde_json::from_slice(&bytes).expect("Invalid JSON");
                }
                _ => continue,
            }
        }
    }

    /// Skip messages until one of the given type arrives
    pub async fn recv_type(&mut self, kind: &str) -> serde_json::Value {
        loop {
            let message = self.recv().await;
            if message["type"] == kind {
                return message;
            }
        }
    }

    pub async fn ping(&mut self) {
        self.stream
            .send(Message::Ping(Vec::new().into()))
            .await
            .expect("Failed to send ping");
    }

    /// Wait until the server closes the connection, failing after 3 seconds
    pub async fn expect_closed(&mut self) {
        let closed = tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "Connection was not closed by the server");
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
