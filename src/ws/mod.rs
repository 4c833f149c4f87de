//! Core WebSocket infrastructure.
//!
//! This module owns the lifecycle of a single WebSocket connection and is
//! specialized for a concrete service through the [`MessageParser`] trait.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: background task that owns the socket, with optional heartbeat and reconnection
//! - [`Connection`]: owned handle returned by [`ConnectionManager::connect`]
//! - [`Event`]: typed lifecycle events delivered to a single consumer, in order
//! - [`MessageParser`]: Trait for parsing incoming WebSocket text frames
//! - [`Handler`]: Callback-style consumer of events
//!
//! # Example
//!
//! ```ignore
//! let endpoint = Endpoint::parse("ws://127.0.0.1:8000/ws/chat")?;
//! let connection = ConnectionManager::connect(endpoint, Config::default(), JsonParser::new());
//! let reason = connection.run(&mut handler).await;
//! ```

pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod traits;

pub use connection::{Connection, ConnectionManager, ConnectionState, Sender};
pub use endpoint::Endpoint;
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use error::DecodeError;
pub use event::{CloseReason, Event};
pub use traits::*;
