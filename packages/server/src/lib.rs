//! Readyroom: room membership and readiness coordination with a bounded room chat.
//!
//! Participants connect over WebSocket, gather in capacity-limited rooms, and
//! toggle readiness. When every member of a full room is ready the room starts
//! exactly once and each member receives a start signal.

pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::{CoordinatorConfig, ServerArgs};
pub use coordinator::Coordinator;
pub use ui::run as run_server;
