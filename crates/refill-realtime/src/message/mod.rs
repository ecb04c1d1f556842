//! Wire messages, parsing, and validation.

pub mod envelope;
pub mod event;
pub mod serializer;
pub mod types;
pub mod validator;

pub use envelope::EventEnvelope;
pub use event::DomainEvent;
pub use serializer::{InboundFrame, parse_frame, serialize_client_frame};
pub use types::{ClientFrame, ControlFrame};
