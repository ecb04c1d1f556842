//! WebSocket connector backed by tokio-tungstenite.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, warn};

use refill_core::error::{AppError, ErrorKind};
use refill_core::result::AppResult;

use super::transport::{CLOSE_ABNORMAL, Connector, TransportChannels, WireEvent, WireMessage};

/// Opens `ws://` / `wss://` sockets and pumps them into channels with one
/// writer task and one reader task.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> AppResult<TransportChannels> {
        let (socket, response) = connect_async(url).await.map_err(|e| {
            AppError::with_source(ErrorKind::Transport, "WebSocket connection failed", e)
        })?;
        debug!(status = response.status().as_u16(), "WebSocket upgrade complete");

        let (mut sink, mut stream) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WireMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<WireEvent>();

        tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                let (frame, closing) = match message {
                    WireMessage::Text(text) => (Message::Text(text.into()), false),
                    WireMessage::Close { code, reason } => (
                        Message::Close(Some(CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.into(),
                        })),
                        true,
                    ),
                };
                if let Err(e) = sink.send(frame).await {
                    warn!(error = %e, "WebSocket write failed");
                    break;
                }
                if closing {
                    break;
                }
            }
            debug!("WebSocket writer ended");
        });

        tokio::spawn(async move {
            let closed = loop {
                let next = tokio::select! {
                    next = stream.next() => next,
                    () = in_tx.closed() => {
                        debug!("WebSocket reader released");
                        return;
                    }
                };
                match next {
                    Some(Ok(Message::Text(text))) => {
                        if in_tx.send(WireEvent::Text(text.as_str().to_string())).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(frame) => WireEvent::Closed {
                                code: u16::from(frame.code),
                                reason: frame.reason.as_str().to_string(),
                            },
                            None => WireEvent::Closed {
                                code: 1005,
                                reason: String::new(),
                            },
                        };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        break WireEvent::Closed {
                            code: CLOSE_ABNORMAL,
                            reason: e.to_string(),
                        };
                    }
                    None => {
                        break WireEvent::Closed {
                            code: CLOSE_ABNORMAL,
                            reason: "Stream ended".to_string(),
                        };
                    }
                }
            };
            let _ = in_tx.send(closed);
            debug!("WebSocket reader ended");
        });

        Ok(TransportChannels {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
