//! The persistent event connection and its transports.

pub mod backoff;
pub mod callbacks;
pub mod heartbeat;
pub mod manager;
pub mod memory;
pub mod state;
pub mod transport;
pub mod tungstenite;

pub use backoff::Backoff;
pub use callbacks::MessageCallbacks;
pub use manager::EventConnection;
pub use memory::{MemoryConnector, MemoryPeer};
pub use state::{ConnectionSnapshot, ConnectionState};
pub use transport::{Connector, TransportChannels, WireEvent, WireMessage};
pub use tungstenite::TungsteniteConnector;
