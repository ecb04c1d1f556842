//! # refill-realtime
//!
//! Realtime event delivery for the Refill client. Provides:
//!
//! - One persistent WebSocket connection with an authenticate handshake
//! - Heartbeat keepalive and capped exponential-backoff reconnection
//! - Type-keyed event fan-out with per-handler failure isolation
//! - Confirmation waits for payment and card flows

pub mod connection;
pub mod dispatcher;
pub mod message;

pub use connection::{
    ConnectionSnapshot, ConnectionState, Connector, EventConnection, MemoryConnector, MemoryPeer,
    TungsteniteConnector,
};
pub use dispatcher::{
    Confirmation, ConfirmationRequest, EventDispatcher, EventHandler, Subscription,
    await_confirmation,
};
pub use message::{ClientFrame, DomainEvent, EventEnvelope};
