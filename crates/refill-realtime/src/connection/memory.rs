//! In-process connector.
//!
//! Each `connect` hands the server side of a channel pair to whoever holds
//! the peer receiver. Used to run the connection against an in-process
//! event source and in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use refill_core::error::AppError;
use refill_core::result::AppResult;

use super::transport::{Connector, TransportChannels, WireEvent, WireMessage};

/// Server side of one in-process transport.
#[derive(Debug)]
pub struct MemoryPeer {
    /// URL the client connected to.
    pub url: String,
    /// Frames the client sent.
    pub from_client: mpsc::UnboundedReceiver<WireMessage>,
    /// Frames delivered to the client.
    pub to_client: mpsc::UnboundedSender<WireEvent>,
}

impl MemoryPeer {
    /// Deliver a text frame. Returns false once the client is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.to_client.send(WireEvent::Text(text.into())).is_ok()
    }

    /// Deliver a JSON frame.
    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        self.send_text(value.to_string())
    }

    /// Close the transport from the server side.
    pub fn close(&self, code: u16, reason: impl Into<String>) -> bool {
        self.to_client
            .send(WireEvent::Closed {
                code,
                reason: reason.into(),
            })
            .is_ok()
    }

    /// Next frame the client sent, if one is queued.
    pub fn try_recv(&mut self) -> Option<WireMessage> {
        self.from_client.try_recv().ok()
    }

    /// Next text frame the client sent, parsed as JSON. `None` once the
    /// client side is dropped.
    pub async fn recv_json(&mut self) -> Option<serde_json::Value> {
        while let Some(message) = self.from_client.recv().await {
            if let WireMessage::Text(text) = message
                && let Ok(value) = serde_json::from_str(&text)
            {
                return Some(value);
            }
        }
        None
    }
}

/// Connector producing [`MemoryPeer`]s.
#[derive(Debug)]
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    refuse: AtomicUsize,
    attempts: Mutex<Vec<Instant>>,
}

impl MemoryConnector {
    /// Create a connector and the receiver its peers arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            peers,
            refuse: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
        };
        (connector, rx)
    }

    /// Fail the next `count` connects as if the server were unreachable.
    pub fn refuse_next(&self, count: usize) {
        self.refuse.store(count, Ordering::SeqCst);
    }

    /// Number of connect calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// When each connect call happened.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> AppResult<TransportChannels> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());

        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(AppError::transport("Connection refused"));
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            url: url.to_string(),
            from_client: out_rx,
            to_client: in_tx,
        };
        self.peers
            .send(peer)
            .map_err(|_| AppError::transport("No in-process server is listening"))?;

        debug!(url, "In-process transport opened");
        Ok(TransportChannels {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
