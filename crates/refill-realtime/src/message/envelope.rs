//! Decoded inbound event.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use refill_core::result::AppResult;
use refill_core::types::Order;

use super::event::DomainEvent;

/// An inbound non-control frame: its type tag plus the whole flat JSON
/// object. Immutable and cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    event_type: String,
    payload: Arc<Map<String, Value>>,
}

impl EventEnvelope {
    /// Build an envelope from a decoded frame object.
    pub fn new(event_type: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: Arc::new(payload),
        }
    }

    /// The frame's `type` tag.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The full frame object, `type` included.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// A top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// A top-level string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// The embedded order snapshot, if the frame carries one.
    pub fn order(&self) -> Option<Order> {
        let order = self.field("order")?;
        serde_json::from_value(order.clone()).ok()
    }

    /// Deserialize the whole frame into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> AppResult<T> {
        Ok(serde_json::from_value(Value::Object((*self.payload).clone()))?)
    }

    /// Typed view of a known domain event.
    pub fn domain_event(&self) -> Option<DomainEvent> {
        DomainEvent::from_envelope(self)
    }

    /// Whether two envelopes share the same decoded frame.
    pub fn same_frame(&self, other: &EventEnvelope) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}
