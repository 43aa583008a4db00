//! Real-time chat hub server.
//!
//! Run with:
//! ```not_rust
//! AGORA_JWT_SECRET=change-me cargo run --bin agora-server
//! ```

use agora_server::ServerConfig;
use agora_shared::logger::setup_logger;
use clap::Parser;

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    // Run the server
    if let Err(e) = agora_server::run_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
