//! Connects to the local chat server, says hello, and logs everything it hears
//! until the server disconnects.
//!
//! Run with:
//! ```sh
//! RUST_LOG=info cargo run --example hello
//! ```

use chat_ws_client::chat::{Client, LoggingHandler};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let client = Client::default();
    info!(endpoint = %client.endpoint(), "Connecting");

    let mut handler = LoggingHandler::new();
    let reason = client.run(&mut handler).await;
    info!(%reason, "Connection finished");

    Ok(())
}
