use tracing::{info, warn};

use super::types::{InboundMessage, OutboundMessage};
use crate::ws::connection::Sender;
use crate::ws::error::DecodeError;
use crate::ws::event::CloseReason;
use crate::ws::traits::Handler;

/// Handler that reports the connection lifecycle through `tracing`.
///
/// Emits `Connected to WebSocket`, `Message from server` for every decoded
/// message, and `Disconnected from WebSocket`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

impl LoggingHandler {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Handler<InboundMessage> for LoggingHandler {
    fn on_open(&mut self, _sender: &Sender) {
        info!("Connected to WebSocket");
    }

    fn on_message(&mut self, message: InboundMessage) {
        info!(payload = %message.payload, "Message from server");
    }

    fn on_decode_error(&mut self, error: &DecodeError) {
        warn!(raw = %error.raw, error = %error.source, "Skipping malformed message from server");
    }

    fn on_reconnecting(&mut self, attempt: u32) {
        info!(attempt, "Reconnecting to WebSocket");
    }

    fn on_close(&mut self, reason: &CloseReason) {
        info!(%reason, "Disconnected from WebSocket");
    }
}

/// Sends the greeting on every opened session, then defers to the wrapped handler.
pub(crate) struct Greeter<'handler, H> {
    greeting: OutboundMessage,
    inner: &'handler mut H,
}

impl<'handler, H> Greeter<'handler, H> {
    pub(crate) fn new(greeting: OutboundMessage, inner: &'handler mut H) -> Self {
        Self { greeting, inner }
    }
}

impl<H: Handler<InboundMessage>> Handler<InboundMessage> for Greeter<'_, H> {
    fn on_open(&mut self, sender: &Sender) {
        self.inner.on_open(sender);
        if let Err(e) = sender.send(&self.greeting) {
            warn!(error = %e, "Unable to send greeting");
        }
    }

    fn on_message(&mut self, message: InboundMessage) {
        self.inner.on_message(message);
    }

    fn on_decode_error(&mut self, error: &DecodeError) {
        self.inner.on_decode_error(error);
    }

    fn on_reconnecting(&mut self, attempt: u32) {
        self.inner.on_reconnecting(attempt);
    }

    fn on_close(&mut self, reason: &CloseReason) {
        self.inner.on_close(reason);
    }
}
