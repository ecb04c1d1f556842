//! Frame type names and client-sent control frames.

use serde::{Deserialize, Serialize};

/// Event type tags used on the wire.
pub mod event_types {
    pub const ORDER_CREATED: &str = "order.created";
    pub const ORDER_UPDATED: &str = "order.update";
    pub const ORDER_GIVEN_AWAY: &str = "order.give_away";
    pub const ORDER_ARRIVAL_STATUS_UPDATED: &str = "order.arrival-status.update";
    pub const CARD_SAVED: &str = "card.save";
    pub const CARD_SAVE_FAILED: &str = "card.save_failed";
    pub const SUBSCRIPTION_PAID: &str = "subscription.payment";
    pub const SUBSCRIPTION_PAYMENT_FAILED: &str = "subscription.payment_failed";

    /// Every domain event type the backend sends.
    pub const ALL: &[&str] = &[
        ORDER_CREATED,
        ORDER_UPDATED,
        ORDER_GIVEN_AWAY,
        ORDER_ARRIVAL_STATUS_UPDATED,
        CARD_SAVED,
        CARD_SAVE_FAILED,
        SUBSCRIPTION_PAID,
        SUBSCRIPTION_PAYMENT_FAILED,
    ];
}

/// Server frames consumed by the connection itself and never dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFrame {
    /// Heartbeat reply.
    Pong,
    /// The server accepted the `authenticate` frame.
    Authenticated,
    /// The server is ready; the connection becomes logically open.
    ConnectionEstablished,
    /// Reply to a diagnostic `test` frame.
    TestResponse,
}

impl ControlFrame {
    /// Match a frame type tag.
    pub fn from_type(frame_type: &str) -> Option<Self> {
        match frame_type {
            "pong" => Some(Self::Pong),
            "authenticated" => Some(Self::Authenticated),
            "connection_established" => Some(Self::ConnectionEstablished),
            "test_response" => Some(Self::TestResponse),
            _ => None,
        }
    }
}

/// Frames the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Heartbeat.
    Ping {
        /// Milliseconds since epoch.
        timestamp: i64,
    },
    /// Binds the connection to the current access token.
    Authenticate {
        /// Access token.
        token: String,
        /// Milliseconds since epoch.
        timestamp: i64,
    },
    /// Diagnostic round trip.
    Test {
        /// Free text.
        message: String,
        /// Milliseconds since epoch.
        timestamp: i64,
        /// Subject claim of the access token.
        #[serde(rename = "userId")]
        user_id: Option<String>,
    },
}

impl ClientFrame {
    /// A ping stamped with the current time.
    pub fn ping() -> Self {
        Self::Ping {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// An authenticate frame stamped with the current time.
    pub fn authenticate(token: impl Into<String>) -> Self {
        Self::Authenticate {
            token: token.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
