//! Shared utilities for Readyroom binaries and libraries.

pub mod logger;
pub mod time;
