use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ws::error::DecodeError;
use crate::ws::traits::MessageParser;

/// Text of the greeting sent when a session opens.
pub const GREETING: &str = "Hello, Server!";

/// Message sent to the chat server.
///
/// Serializes as `{"message": "..."}`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct OutboundMessage {
    #[builder(into)]
    pub message: String,
}

impl OutboundMessage {
    #[must_use]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for OutboundMessage {
    fn default() -> Self {
        Self::new(GREETING)
    }
}

/// Message received from the chat server.
///
/// No schema is enforced, the payload is whatever JSON the server sent.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundMessage {
    /// Decoded JSON document
    pub payload: Value,
    /// When the frame was decoded
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Decode one text frame holding exactly one JSON document.
pub fn parse_message(text: &str) -> Result<InboundMessage, DecodeError> {
    serde_json::from_str(text)
        .map(InboundMessage::new)
        .map_err(|e| DecodeError::new(text, e))
}

/// Decodes every text frame as one JSON document into an [`InboundMessage`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl JsonParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MessageParser<InboundMessage> for JsonParser {
    fn parse(&self, text: &str) -> Result<InboundMessage, DecodeError> {
        parse_message(text)
    }
}
