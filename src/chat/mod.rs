//! Client for the chat service WebSocket.
//!
//! Connects to `ws://127.0.0.1:8000/ws/chat` by default, sends
//! `{"message": "Hello, Server!"}` once the socket opens, and hands every
//! inbound JSON document to a [`Handler`](crate::ws::Handler).
//!
//! # Example
//!
//! ```rust, no_run
//! use chat_ws_client::chat::{Client, LoggingHandler};
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     let mut handler = LoggingHandler::new();
//!     Client::default().run(&mut handler).await;
//! }
//! ```

pub mod client;
pub mod handler;
pub mod types;

// Re-export commonly used types
pub use client::{Client, DEFAULT_ENDPOINT};
pub use handler::LoggingHandler;
pub use types::{GREETING, InboundMessage, JsonParser, OutboundMessage};
