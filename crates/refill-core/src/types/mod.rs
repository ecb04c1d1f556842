//! Core type definitions shared across the Refill workspace.

pub mod order;
pub mod role;
pub mod session;

pub use order::{Additive, ArrivalStatus, Order, OrderCoffee, OrderFood, OrderStatus, OrderType};
pub use role::UserRole;
pub use session::{RefreshedTokens, Session, StoredCredentials};
