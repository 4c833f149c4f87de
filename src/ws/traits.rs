//! Core traits for generic WebSocket infrastructure.

use super::connection::Sender;
use super::error::DecodeError;
use super::event::CloseReason;

/// Message parser trait for converting one raw text frame to a message.
///
/// # Example
///
/// ```ignore
/// pub struct JsonParser;
///
/// impl MessageParser<serde_json::Value> for JsonParser {
///     fn parse(&self, text: &str) -> Result<serde_json::Value, DecodeError> {
///         serde_json::from_str(text).map_err(|e| DecodeError::new(text, e))
///     }
/// }
/// ```
pub trait MessageParser<M>: Send + Sync + 'static {
    /// Parse one inbound text frame.
    fn parse(&self, text: &str) -> Result<M, DecodeError>;
}

/// Callbacks for connection lifecycle events.
///
/// Invoked sequentially from a single loop, never concurrently with each
/// other, in the order the events happened.
pub trait Handler<M>: Send {
    /// The socket is open. `sender` queues outbound frames on this connection.
    fn on_open(&mut self, sender: &Sender) {
        _ = sender;
    }

    /// A decoded inbound message.
    fn on_message(&mut self, message: M);

    /// An inbound frame that failed to decode. It has already been skipped.
    fn on_decode_error(&mut self, error: &DecodeError) {
        _ = error;
    }

    /// The session was lost and reconnect attempt `attempt` is scheduled.
    fn on_reconnecting(&mut self, attempt: u32) {
        _ = attempt;
    }

    /// The connection is closed. Called exactly once, last.
    fn on_close(&mut self, reason: &CloseReason) {
        _ = reason;
    }
}
