#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Each test binary uses a different subset of the helpers"
)]

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_ws_client::ws::{Connection, Event};
use futures_util::{SinkExt as _, StreamExt as _};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing_subscriber::fmt::MakeWriter;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub const GREETING_JSON: &str = r#"{"message":"Hello, Server!"}"#;

/// What the mock server should do on every open connection.
#[derive(Debug, Clone)]
pub enum Command {
    /// Write a text frame
    Text(String),
    /// Write a binary frame
    Binary(Vec<u8>),
    /// Start a normal close handshake
    Close,
    /// Drop the TCP stream without a close frame
    Drop,
}

/// Mock WebSocket server.
pub struct MockWsServer {
    addr: SocketAddr,
    /// Broadcast commands to ALL connected clients
    command_tx: broadcast::Sender<Command>,
    /// Text frames received from clients
    received_rx: mpsc::UnboundedReceiver<String>,
    /// Request paths of accepted handshakes
    paths: Arc<Mutex<Vec<String>>>,
    accepted: Arc<AtomicUsize>,
    disconnected: Arc<AtomicUsize>,
}

impl MockWsServer {
    /// Start a mock WebSocket server on a random port.
    pub async fn start() -> Self {
        Self::bind("127.0.0.1:0").await
    }

    pub async fn bind(addr: &str) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (command_tx, _) = broadcast::channel::<Command>(100);
        let (received_tx, received_rx) = mpsc::unbounded_channel::<String>();
        let paths = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(AtomicUsize::new(0));
        let disconnected = Arc::new(AtomicUsize::new(0));

        let broadcast_tx = command_tx.clone();
        let server_paths = Arc::clone(&paths);
        let server_accepted = Arc::clone(&accepted);
        let server_disconnected = Arc::clone(&disconnected);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };

                // Subscribe before the handshake so no command sent after the client opens is missed
                let mut command_rx = broadcast_tx.subscribe();
                let paths = Arc::clone(&server_paths);
                let callback = move |request: &Request, response: Response| {
                    paths.lock().unwrap().push(request.uri().path().to_owned());
                    Ok::<Response, ErrorResponse>(response)
                };

                let Ok(ws_stream) = tokio_tungstenite::accept_hdr_async(stream, callback).await
                else {
                    continue;
                };
                server_accepted.fetch_add(1, Ordering::SeqCst);

                let (mut write, mut read) = ws_stream.split();
                let received_tx = received_tx.clone();
                let disconnected = Arc::clone(&server_disconnected);

                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            msg = read.next() => {
                                match msg {
                                    Some(Ok(Message::Text(text))) => {
                                        drop(received_tx.send(text.to_string()));
                                    }
                                    Some(Ok(_)) => {}
                                    _ => break,
                                }
                            }
                            command = command_rx.recv() => {
                                let frame = match command {
                                    Ok(Command::Text(text)) => Message::Text(text.into()),
                                    Ok(Command::Binary(bytes)) => Message::Binary(bytes.into()),
                                    Ok(Command::Close) => Message::Close(Some(CloseFrame {
                                        code: CloseCode::Normal,
                                        reason: "bye".into(),
                                    })),
                                    Ok(Command::Drop) | Err(_) => break,
                                };
                                if write.send(frame).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    disconnected.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            addr,
            command_tx,
            received_rx,
            paths,
            accepted,
            disconnected,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Send a text frame to all connected clients.
    pub fn send(&self, text: &str) {
        drop(self.command_tx.send(Command::Text(text.to_owned())));
    }

    pub fn send_binary(&self, bytes: &[u8]) {
        drop(self.command_tx.send(Command::Binary(bytes.to_vec())));
    }

    /// Close all connections with code 1000 and reason `bye`.
    pub fn close(&self) {
        drop(self.command_tx.send(Command::Close));
    }

    /// Drop all connections without a close handshake.
    pub fn drop_connections(&self) {
        drop(self.command_tx.send(Command::Drop));
    }

    /// Receive the next text frame sent by any client.
    pub async fn recv(&mut self) -> Option<String> {
        timeout(RECV_TIMEOUT, self.received_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Assert no client frame arrives within `window`.
    pub async fn assert_silent(&mut self, window: Duration) {
        let frame = timeout(window, self.received_rx.recv()).await;
        assert!(frame.is_err(), "unexpected client frame: {frame:?}");
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    /// Wait until `count` connections have ended on the server side.
    pub async fn wait_disconnected(&self, count: usize) {
        let waited = timeout(RECV_TIMEOUT, async {
            while self.disconnected.load(Ordering::SeqCst) < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "server saw fewer than {count} disconnects");
    }
}

/// A local address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Next event, failing the test if none arrives in time.
pub async fn next_event<M>(connection: &mut Connection<M>) -> Event<M> {
    timeout(RECV_TIMEOUT, connection.next_event())
        .await
        .expect("timed out waiting for event")
        .expect("event queue ended")
}

/// In-memory `tracing` output for asserting on log lines.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.contents().matches(needle).count()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'writer> MakeWriter<'writer> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'writer self) -> Self::Writer {
        self.clone()
    }
}

/// Capture INFO and above for the current thread until the guard drops.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
