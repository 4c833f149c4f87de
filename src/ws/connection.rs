#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::fmt::Debug;
use std::future::pending;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt as _, Stream, StreamExt as _};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, interval_at, sleep, sleep_until, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use super::config::{Config, HeartbeatConfig};
use super::endpoint::Endpoint;
use super::error::WsError;
use super::event::{CloseReason, Event};
use super::traits::{Handler, MessageParser};
use crate::Result;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Event queue capacity. A full queue pauses socket reads until the consumer catches up.
const EVENT_CAPACITY: usize = 1024;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Opening handshake in progress
    Connecting,
    /// Handshake completed, frames flow in both directions
    Open {
        /// When the connection was established
        since: Instant,
    },
    /// A close frame has been sent or received
    Closing,
    /// Terminal state, nothing more will be sent or delivered
    Closed,
    /// A session was lost, backing off or handshaking again
    Reconnecting {
        /// 1-based reconnect attempt since the last successful handshake
        attempt: u32,
    },
}

impl ConnectionState {
    /// Check if the connection is currently open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open { .. })
    }

    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Whether a frame queued now would be written to the wire.
    #[must_use]
    pub const fn accepts_frames(self) -> bool {
        matches!(self, Self::Connecting | Self::Open { .. })
    }
}

/// Cloneable handle for queueing outbound text frames.
///
/// Frames queued while the connection is still connecting are written once it
/// opens. Frames are refused while closing, closed or reconnecting, so a new
/// session never starts with frames meant for the previous one.
#[derive(Debug, Clone)]
pub struct Sender {
    tx: mpsc::UnboundedSender<String>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl Sender {
    /// Serialize `request` as JSON and queue it as one text frame.
    pub fn send<R: Serialize>(&self, request: &R) -> Result<()> {
        let json = serde_json::to_string(request)?;
        self.send_text(json)
    }

    /// Queue a raw text frame.
    pub fn send_text<S: Into<String>>(&self, text: S) -> Result<()> {
        // The borrow is held until the frame is queued so a concurrent state
        // change cannot slip in between the check and the send
        let state = self.state_rx.borrow();
        if !state.accepts_frames() {
            return Err(WsError::ConnectionClosed.into());
        }
        self.tx
            .send(text.into())
            .map_err(|_e| WsError::ConnectionClosed)?;
        drop(state);
        Ok(())
    }
}

/// Owned handle to one WebSocket connection.
///
/// Returned by [`ConnectionManager::connect`] in the [`ConnectionState::Connecting`]
/// state. Dropping the handle closes the connection.
pub struct Connection<M> {
    id: Uuid,
    endpoint: Endpoint,
    state_rx: watch::Receiver<ConnectionState>,
    sender: Sender,
    events_rx: mpsc::Receiver<Event<M>>,
    shutdown: CancellationToken,
    _guard: DropGuard,
}

impl<M> Debug for Connection<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("state", &*self.state_rx.borrow())
            .finish_non_exhaustive()
    }
}

impl<M> Connection<M> {
    /// Identifier of the manager owning this connection, as seen in logs.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    #[must_use]
    pub fn sender(&self) -> Sender {
        self.sender.clone()
    }

    /// Serialize `request` as JSON and queue it as one text frame.
    pub fn send<R: Serialize>(&self, request: &R) -> Result<()> {
        self.sender.send(request)
    }

    /// Queue a raw text frame.
    pub fn send_text<S: Into<String>>(&self, text: S) -> Result<()> {
        self.sender.send_text(text)
    }

    /// Start a client-initiated close.
    ///
    /// The [`Event::Closed`] event still has to be drained from the queue.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Wait for the next lifecycle event.
    ///
    /// Returns `None` once [`Event::Closed`] has been delivered.
    pub async fn next_event(&mut self) -> Option<Event<M>> {
        self.events_rx.recv().await
    }

    /// Drive the connection to completion, dispatching every event to `handler`.
    ///
    /// Returns the reason the connection closed, after `on_close` has run.
    pub async fn run<H: Handler<M>>(mut self, handler: &mut H) -> CloseReason {
        let sender = self.sender();

        while let Some(event) = self.next_event().await {
            match event {
                Event::Opened => handler.on_open(&sender),
                Event::Message(message) => handler.on_message(message),
                Event::Malformed(error) => handler.on_decode_error(&error),
                Event::Reconnecting { attempt } => handler.on_reconnecting(attempt),
                Event::Closed(reason) => {
                    handler.on_close(&reason);
                    return reason;
                }
            }
        }

        // The queue only ends early if the connection task died
        let reason = CloseReason::Transport("connection task ended unexpectedly".to_owned());
        handler.on_close(&reason);
        reason
    }
}

impl<M: Send + 'static> Connection<M> {
    /// Consume the handle into a stream of events ending with [`Event::Closed`].
    pub fn into_stream(self) -> impl Stream<Item = Event<M>> {
        async_stream::stream! {
            let mut connection = self;
            while let Some(event) = connection.next_event().await {
                yield event;
            }
        }
    }
}

/// Supervises one WebSocket connection: handshake, frame I/O, heartbeat,
/// optional reconnection, and close.
///
/// The manager runs as a single background task and is the only owner of the
/// socket. It talks to its [`Connection`] handle exclusively through channels.
///
/// # Type Parameters
///
/// - `M`: Decoded inbound message type
/// - `P`: Parser type that implements [`MessageParser<M>`]
///
/// # Example
///
/// ```ignore
/// let endpoint = Endpoint::parse("ws://127.0.0.1:8000/ws/chat")?;
/// let mut connection = ConnectionManager::connect(endpoint, Config::default(), JsonParser::new());
///
/// while let Some(event) = connection.next_event().await {
///     println!("{event:?}");
/// }
/// ```
pub struct ConnectionManager<M, P> {
    id: Uuid,
    endpoint: Endpoint,
    config: Config,
    parser: P,
    sender_rx: mpsc::UnboundedReceiver<String>,
    events_tx: mpsc::Sender<Event<M>>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
}

impl<M, P> ConnectionManager<M, P>
where
    M: Debug + Send + 'static,
    P: MessageParser<M>,
{
    /// Start connecting to `endpoint` and return immediately.
    ///
    /// The connection loop runs in a background task on the current tokio
    /// runtime. The returned handle starts in [`ConnectionState::Connecting`].
    pub fn connect(endpoint: Endpoint, config: Config, parser: P) -> Connection<M> {
        let id = Uuid::new_v4();
        let (sender_tx, sender_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let shutdown = CancellationToken::new();

        let manager = Self {
            id,
            endpoint: endpoint.clone(),
            config,
            parser,
            sender_rx,
            events_tx,
            state_tx,
            shutdown: shutdown.clone(),
        };

        tracing::debug!(%id, %endpoint, "Starting WebSocket connection");
        tokio::spawn(manager.connection_loop());

        Connection {
            id,
            endpoint,
            sender: Sender {
                tx: sender_tx,
                state_rx: state_rx.clone(),
            },
            state_rx,
            events_rx,
            _guard: shutdown.clone().drop_guard(),
            shutdown,
        }
    }

    /// Main connection loop with optional reconnection.
    async fn connection_loop(mut self) {
        // Reconnect attempts since the last successful handshake
        let mut attempt = 0_u32;
        let mut backoff: Option<ExponentialBackoff> = self.config.reconnect.clone().map(Into::into);

        let reason = loop {
            let reason = match self.open().await {
                Ok(Some(ws_stream)) => {
                    attempt = 0;
                    if let Some(backoff) = backoff.as_mut() {
                        backoff.reset();
                    }
                    self.set_state(ConnectionState::Open {
                        since: Instant::now(),
                    });
                    self.emit(Event::Opened).await;

                    self.handle_connection(ws_stream).await
                }
                Ok(None) => CloseReason::Client,
                Err(reason) => reason,
            };

            if reason.is_client() || self.shutdown.is_cancelled() {
                break CloseReason::Client;
            }

            // Check if we should reconnect at all
            let Some(reconnect) = &self.config.reconnect else {
                break reason;
            };
            if let Some(max) = reconnect.max_attempts
                && attempt >= max
            {
                tracing::debug!(id = %self.id, attempt, "Giving up reconnecting");
                break reason;
            }

            attempt = attempt.saturating_add(1);
            tracing::debug!(id = %self.id, %reason, attempt, "Reconnecting");
            self.set_state(ConnectionState::Reconnecting { attempt });
            self.discard_pending();
            self.emit(Event::Reconnecting { attempt }).await;

            if let Some(delay) = backoff.as_mut().and_then(Backoff::next_backoff) {
                tokio::select! {
                    () = self.shutdown.cancelled() => break CloseReason::Client,
                    () = sleep(delay) => {}
                }
            }
        };

        self.set_state(ConnectionState::Closed);
        tracing::debug!(id = %self.id, %reason, "WebSocket connection closed");
        self.emit(Event::Closed(reason)).await;
    }

    /// Run the opening handshake. `Ok(None)` means the handle closed first.
    async fn open(&self) -> std::result::Result<Option<WsStream>, CloseReason> {
        tokio::select! {
            () = self.shutdown.cancelled() => Ok(None),
            result = self.handshake() => match result {
                Ok(ws_stream) => Ok(Some(ws_stream)),
                Err(e) => {
                    tracing::warn!(id = %self.id, endpoint = %self.endpoint, error = %e, "Unable to connect");
                    Err(CloseReason::Transport(e.to_string()))
                }
            },
        }
    }

    async fn handshake(&self) -> std::result::Result<WsStream, WsError> {
        let connecting = connect_async(self.endpoint.as_str());
        let (ws_stream, _response) = match self.config.connect_timeout {
            Some(limit) => timeout(limit, connecting)
                .await
                .map_err(|_elapsed| WsError::Timeout)?,
            None => connecting.await,
        }
        .map_err(WsError::Connection)?;

        Ok(ws_stream)
    }

    /// Handle an open WebSocket session until it ends.
    async fn handle_connection(&mut self, ws_stream: WsStream) -> CloseReason {
        let (mut write, mut read) = ws_stream.split();

        let heartbeat = self.config.heartbeat.clone();
        let mut ping_interval = heartbeat.as_ref().map(|h| {
            let first = Instant::now() + h.interval;
            interval_at(first, h.interval)
        });
        let mut pong_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    return self.close_gracefully(&mut write, &mut read).await;
                }

                // Handle incoming frames
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            tracing::trace!(id = %self.id, text = %text.as_str(), "Received WebSocket text message");
                            self.dispatch(text.as_str()).await;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            pong_deadline = None;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            self.set_state(ConnectionState::Closing);
                            // Polling once more flushes the queued close reply
                            _ = timeout(self.config.close_timeout, read.next()).await;
                            return match frame {
                                Some(frame) => CloseReason::Server {
                                    code: Some(u16::from(frame.code)),
                                    reason: frame.reason.as_str().to_owned(),
                                },
                                None => CloseReason::Server {
                                    code: None,
                                    reason: String::new(),
                                },
                            };
                        }
                        Some(Ok(_)) => {
                            // Binary frames are ignored, PINGs are answered by tungstenite
                        }
                        Some(Err(e)) => {
                            let error = WsError::Connection(e);
                            tracing::error!(id = %self.id, %error, "WebSocket session failed");
                            return CloseReason::Transport(error.to_string());
                        }
                        None => {
                            tracing::error!(id = %self.id, "WebSocket stream ended without a close frame");
                            return CloseReason::Transport("stream ended without a close frame".to_owned());
                        }
                    }
                }

                // Handle outgoing frames
                Some(text) = self.sender_rx.recv() => {
                    tracing::trace!(id = %self.id, %text, "Sending WebSocket text message");
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        let error = WsError::Connection(e);
                        tracing::error!(id = %self.id, %error, "Unable to send WebSocket message");
                        return CloseReason::Transport(error.to_string());
                    }
                }

                () = tick(ping_interval.as_mut()) => {
                    if pong_deadline.is_none()
                        && let Some(heartbeat) = &heartbeat
                    {
                        if let Err(e) = write.send(Message::Ping(Vec::<u8>::new().into())).await {
                            return CloseReason::Transport(WsError::Connection(e).to_string());
                        }
                        pong_deadline = Some(Instant::now() + heartbeat.timeout);
                    }
                }

                () = deadline(pong_deadline) => {
                    tracing::warn!(
                        id = %self.id,
                        timeout = ?heartbeat.as_ref().map(|h: &HeartbeatConfig| h.timeout),
                        "Heartbeat timeout: no PONG received"
                    );
                    return CloseReason::HeartbeatTimeout;
                }
            }
        }
    }

    /// Flush queued frames, send a close frame and wait a bounded time for the
    /// server to answer.
    async fn close_gracefully(&mut self, write: &mut WsSink, read: &mut WsSource) -> CloseReason {
        self.set_state(ConnectionState::Closing);

        // Frames accepted before `Closing` was published are still owed to the server
        while let Ok(text) = self.sender_rx.try_recv() {
            tracing::trace!(id = %self.id, %text, "Flushing WebSocket text message before close");
            if let Err(e) = write.send(Message::Text(text.into())).await {
                tracing::debug!(id = %self.id, error = %e, "Unable to flush message before close");
                return CloseReason::Client;
            }
        }

        if write.send(Message::Close(None)).await.is_ok() {
            let reply = async {
                while let Some(Ok(msg)) = read.next().await {
                    if msg.is_close() {
                        break;
                    }
                }
            };
            if timeout(self.config.close_timeout, reply).await.is_err() {
                tracing::debug!(id = %self.id, "Server did not answer the close frame in time");
            }
        }

        CloseReason::Client
    }

    /// Decode one text frame and queue the outcome.
    async fn dispatch(&self, text: &str) {
        let event = match self.parser.parse(text) {
            Ok(message) => {
                tracing::trace!(id = %self.id, ?message, "Parsed WebSocket message");
                Event::Message(message)
            }
            Err(e) => {
                tracing::warn!(id = %self.id, raw = %e.raw, error = %e.source, "Failed to parse WebSocket message");
                Event::Malformed(e)
            }
        };
        self.emit(event).await;
    }

    /// Drop frames the lost session never wrote.
    fn discard_pending(&mut self) {
        let mut discarded = 0_usize;
        while self.sender_rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!(id = %self.id, discarded, "Discarded frames queued for the lost session");
        }
    }

    async fn emit(&self, event: Event<M>) {
        if self.events_tx.send(event).await.is_err() {
            tracing::trace!(id = %self.id, "Event consumer is gone, dropping event");
        }
    }

    fn set_state(&self, state: ConnectionState) {
        tracing::trace!(id = %self.id, ?state, "Connection state changed");
        self.state_tx.send_replace(state);
    }
}

async fn tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}
