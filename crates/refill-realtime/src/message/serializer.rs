//! JSON parsing of inbound frames and serialization of client frames.

use serde_json::Value;

use refill_core::error::{AppError, ErrorKind};
use refill_core::result::AppResult;

use super::envelope::EventEnvelope;
use super::types::{ClientFrame, ControlFrame};
use super::validator::validate_inbound;

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Consumed by the connection.
    Control(ControlFrame),
    /// Forwarded to subscribers.
    Event(EventEnvelope),
}

/// Parse one inbound text frame.
///
/// Oversized, empty, non-JSON, non-object and untyped frames are
/// `Protocol` errors.
pub fn parse_frame(raw: &str, max_size: usize) -> AppResult<InboundFrame> {
    validate_inbound(raw, max_size)?;

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::with_source(ErrorKind::Protocol, "Frame is not valid JSON", e))?;
    let Value::Object(map) = value else {
        return Err(AppError::protocol("Frame is not a JSON object"));
    };
    let Some(frame_type) = map.get("type").and_then(Value::as_str).map(str::to_string) else {
        return Err(AppError::protocol("Frame has no string `type` field"));
    };

    Ok(match ControlFrame::from_type(&frame_type) {
        Some(control) => InboundFrame::Control(control),
        None => InboundFrame::Event(EventEnvelope::new(frame_type, map)),
    })
}

/// Serialize a client frame to JSON text.
pub fn serialize_client_frame(frame: &ClientFrame) -> AppResult<String> {
    Ok(serde_json::to_string(frame)?)
}
