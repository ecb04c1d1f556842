//! Transport seam for the event connection.
//!
//! A connector opens a socket and bridges it into two channels, so the
//! connection logic never touches socket types.

use async_trait::async_trait;
use tokio::sync::mpsc;

use refill_core::result::AppResult;

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// The client is abandoning a dead transport.
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Abnormal closure; no close frame was received.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Frames the client writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    /// A text frame.
    Text(String),
    /// Close the socket with a code and reason.
    Close {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// What the socket delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// A text frame.
    Text(String),
    /// The socket closed. Always the last event.
    Closed {
        /// Close code; `1006` when the peer vanished.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// Both directions of an open transport.
#[derive(Debug)]
pub struct TransportChannels {
    /// Client to server.
    pub outbound: mpsc::UnboundedSender<WireMessage>,
    /// Server to client.
    pub inbound: mpsc::UnboundedReceiver<WireEvent>,
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug + 'static {
    /// Open a transport to `url`. An error means the transport never opened.
    async fn connect(&self, url: &str) -> AppResult<TransportChannels>;
}
