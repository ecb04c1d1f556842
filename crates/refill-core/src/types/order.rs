//! Order snapshot embedded in realtime order events.
//!
//! Fields are camelCase on the wire; unknown fields are ignored and most
//! fields default so partial snapshots decode.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    InProgress,
    Completed,
    Cancelled,
    PickedUp,
}

/// How soon the customer expects to arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalStatus {
    Here,
    Min5,
    Min10,
    Min15,
    Min20,
}

/// Where the order is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    InCafe,
    Pickup,
}

/// Drink add-on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Additive {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub attachment_urls: Vec<String>,
}

/// Drink line item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderCoffee {
    pub id: String,
    pub name: String,
    pub cup_size: String,
    pub price: f64,
    /// Paid for by a subscription.
    pub is_sub: bool,
    pub attachment_urls: Vec<String>,
    pub additives: Vec<Additive>,
}

/// Food line item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderFood {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub attachment_urls: Vec<String>,
}

/// Full or partial order snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    pub id: String,
    pub cafe_id: String,
    pub client_id: String,
    pub client_username: String,
    pub client_phone_number: String,
    pub total_price: f64,
    pub coffees: Vec<OrderCoffee>,
    pub food: Vec<OrderFood>,
    pub arrival_status: Option<ArrivalStatus>,
    pub arrival_time: Option<String>,
    pub cancellation_reason: Option<String>,
    pub status: Option<OrderStatus>,
    pub created_at: Option<String>,
    pub in_progress_at: Option<String>,
    pub completed_at: Option<String>,
    pub picked_up_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub client_comment: Option<String>,
    pub order_type: Option<OrderType>,
}
