#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

/// WebSocket transport error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum SocketError {
    /// Handshake with the pipeline server failed
    Connect(tokio_tungstenite::tungstenite::Error),
    /// Mid-stream failure while reading or writing frames
    Transport(tokio_tungstenite::tungstenite::Error),
    /// Accumulated message exceeded the configured size bound
    MessageTooLarge {
        /// Bytes accumulated when the bound was exceeded
        size: usize,
        /// Configured maximum message size in bytes
        limit: usize,
    },
    /// The server closed the connection
    ConnectionClosed,
    /// Handshake did not complete within the attempt ceiling
    HandshakeTimeout,
    /// Establishing the proxy tunnel failed
    Proxy(std::io::Error),
    /// Event stream lagged and missed messages
    Lagged {
        /// Number of messages that were missed
        count: u64,
    },
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "WebSocket handshake failed: {e}"),
            Self::Transport(e) => write!(f, "WebSocket transport error: {e}"),
            Self::MessageTooLarge { size, limit } => {
                write!(f, "incoming message of {size} bytes exceeds limit of {limit} bytes")
            }
            Self::ConnectionClosed => write!(f, "WebSocket connection closed"),
            Self::HandshakeTimeout => write!(f, "WebSocket handshake timed out"),
            Self::Proxy(e) => write!(f, "proxy tunnel failed: {e}"),
            Self::Lagged { count } => write!(f, "event stream lagged, missed {count} messages"),
        }
    }
}

impl StdError for SocketError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connect(e) | Self::Transport(e) => Some(e),
            Self::Proxy(e) => Some(e),
            _ => None,
        }
    }
}

// Integration with main Error type
impl From<SocketError> for crate::error::Error {
    fn from(e: SocketError) -> Self {
        let kind = match &e {
            SocketError::Connect(_) | SocketError::HandshakeTimeout | SocketError::Proxy(_) => {
                crate::error::Kind::Connection
            }
            _ => crate::error::Kind::Transport,
        };
        crate::error::Error::with_source(kind, e)
    }
}
