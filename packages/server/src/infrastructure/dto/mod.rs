//! Data transfer objects exposed by the HTTP API.

pub mod http;
