//! Readyroom lobby server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin readyroom-server -- --port 8080 --default-capacity 4
//! ```

use clap::Parser;
use readyroom_server::ServerArgs;
use readyroom_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // Run the server
    if let Err(e) = readyroom_server::run_server(args).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
