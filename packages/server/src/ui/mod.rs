//! WebSocket and HTTP host of the coordinator.

mod handler;
mod runner;
mod signal;
pub mod state;

pub use runner::{build_router, run, serve_with_listener};
