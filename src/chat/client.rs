use super::handler::Greeter;
use super::types::{InboundMessage, JsonParser, OutboundMessage};
use crate::Result;
use crate::ws::config::Config;
use crate::ws::connection::{Connection, ConnectionManager};
use crate::ws::endpoint::Endpoint;
use crate::ws::event::CloseReason;
use crate::ws::traits::Handler;

/// Endpoint of the local chat server.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8000/ws/chat";

/// Chat client: one connection per [`Client::run`] or [`Client::connect`]
/// call, greeting the server each time a session opens.
///
/// # Examples
///
/// ```rust, no_run
/// use chat_ws_client::chat::{Client, LoggingHandler};
///
/// #[tokio::main]
/// async fn main() {
///     let mut handler = LoggingHandler::new();
///     let reason = Client::default().run(&mut handler).await;
///     println!("closed: {reason}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    endpoint: Endpoint,
    config: Config,
    greeting: OutboundMessage,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, Config::default())
            .expect("chat client with default endpoint should succeed")
    }
}

impl Client {
    /// Create a client for `endpoint`. Fails if it is not a `ws`/`wss` URL.
    pub fn new(endpoint: &str, config: Config) -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::parse(endpoint)?,
            config,
            greeting: OutboundMessage::default(),
        })
    }

    /// Replace the message sent when a session opens.
    #[must_use]
    pub fn with_greeting(mut self, greeting: OutboundMessage) -> Self {
        self.greeting = greeting;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn greeting(&self) -> &OutboundMessage {
        &self.greeting
    }

    /// Open a raw connection. The greeting is not sent automatically.
    #[must_use]
    pub fn connect(&self) -> Connection<InboundMessage> {
        ConnectionManager::connect(self.endpoint.clone(), self.config.clone(), JsonParser::new())
    }

    /// Connect, greet the server on every opened session, and dispatch all
    /// events to `handler` until the connection closes.
    pub async fn run<H: Handler<InboundMessage>>(&self, handler: &mut H) -> CloseReason {
        let mut greeter = Greeter::new(self.greeting.clone(), handler);
        self.connect().run(&mut greeter).await
    }
}
