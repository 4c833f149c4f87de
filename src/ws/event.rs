use std::fmt;

use super::error::DecodeError;

/// Lifecycle event pushed by the connection task onto the event queue.
///
/// Events are delivered to a single consumer in the order they happened.
/// [`Event::Closed`] is always the final event of a connection.
#[non_exhaustive]
#[derive(Debug)]
pub enum Event<M> {
    /// The opening handshake completed and the socket is open
    Opened,
    /// A text frame was received and decoded
    Message(M),
    /// A text frame was received but could not be decoded. The connection stays open.
    Malformed(DecodeError),
    /// The session was lost and a new attempt is scheduled
    Reconnecting {
        /// 1-based reconnect attempt since the last successful handshake
        attempt: u32,
    },
    /// The connection reached its terminal state
    Closed(CloseReason),
}

/// Why a connection ended.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The server sent a close frame
    Server {
        /// Close code, if the frame carried one
        code: Option<u16>,
        /// Close reason text, possibly empty
        reason: String,
    },
    /// Closed locally via `close()` or by dropping the connection handle
    Client,
    /// The handshake failed or the stream ended abnormally
    Transport(String),
    /// No PONG arrived within the heartbeat timeout
    HeartbeatTimeout,
}

impl CloseReason {
    /// Whether the close was requested by this side.
    #[must_use]
    pub const fn is_client(&self) -> bool {
        matches!(self, Self::Client)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server { code, reason } => {
                write!(f, "closed by server")?;
                if let Some(code) = code {
                    write!(f, " ({code})")?;
                }
                if !reason.is_empty() {
                    write!(f, ": {reason}")?;
                }
                Ok(())
            }
            Self::Client => write!(f, "closed by client"),
            Self::Transport(message) => write!(f, "transport failure: {message}"),
            Self::HeartbeatTimeout => write!(f, "heartbeat timeout"),
        }
    }
}
