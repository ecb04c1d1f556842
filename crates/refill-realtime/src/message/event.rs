//! Typed domain events.
//!
//! Frames are flat objects; consumers destructure them by type. Every field
//! except the embedded order of `order.created` is optional.

use serde::Deserialize;
use tracing::debug;

use refill_core::types::{ArrivalStatus, Order, OrderStatus};

use super::envelope::EventEnvelope;

/// Known domain events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum DomainEvent {
    /// A new order was placed; carries the full snapshot.
    #[serde(rename = "order.created")]
    OrderCreated { order: Order },

    /// An order changed status.
    #[serde(rename = "order.update")]
    OrderUpdated {
        #[serde(default)]
        order: Option<Order>,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        status: Option<OrderStatus>,
        #[serde(default)]
        cancellation_reason: Option<String>,
    },

    /// An order was handed to the customer.
    #[serde(rename = "order.give_away")]
    OrderGivenAway {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        order_id: Option<String>,
        #[serde(default)]
        code: Option<String>,
    },

    /// The customer updated their expected arrival.
    #[serde(rename = "order.arrival-status.update")]
    ArrivalStatusUpdated {
        #[serde(default)]
        order_id: Option<String>,
        #[serde(default)]
        arrival_status: Option<ArrivalStatus>,
        #[serde(default)]
        arrival_time: Option<String>,
    },

    /// A payment card was saved.
    #[serde(rename = "card.save")]
    CardSaved {
        #[serde(default)]
        card_id: Option<String>,
        #[serde(default)]
        card_brand: Option<String>,
        #[serde(default)]
        card_number: Option<String>,
    },

    /// Saving a payment card failed.
    #[serde(rename = "card.save_failed")]
    CardSaveFailed {
        #[serde(default)]
        card_error: Option<String>,
    },

    /// A subscription was paid for.
    #[serde(rename = "subscription.payment")]
    SubscriptionPaid {
        #[serde(default)]
        sub_id: Option<String>,
        #[serde(default)]
        sub_name: Option<String>,
        #[serde(default)]
        balance: Option<f64>,
        #[serde(default)]
        daily_balance: Option<f64>,
        #[serde(default)]
        start_date: Option<String>,
        #[serde(default)]
        end_date: Option<String>,
    },

    /// A subscription payment failed.
    #[serde(rename = "subscription.payment_failed")]
    SubscriptionPaymentFailed {
        #[serde(default)]
        sub_id: Option<String>,
        #[serde(default)]
        user_id: Option<String>,
    },
}

impl DomainEvent {
    /// Typed view of an envelope; `None` for unknown types or frames whose
    /// fields do not match their type.
    pub fn from_envelope(envelope: &EventEnvelope) -> Option<Self> {
        match envelope.decode::<DomainEvent>() {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(event_type = envelope.event_type(), error = %e, "Frame is not a known domain event");
                None
            }
        }
    }
}
