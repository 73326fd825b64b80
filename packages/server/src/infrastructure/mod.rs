//! Infrastructure layer: in-memory repositories, wire codec, WebSocket
//! transport and HTTP DTOs.

pub mod codec;
pub mod dto;
pub mod repository;
pub mod transport;

pub use transport::WebSocketTransport;
