//! # refill-session
//!
//! Ties the session layer together:
//!
//! - `coordinator`: opens and closes the event connection as the session
//!   authenticates and ends
//! - `context`: the explicitly constructed service graph handed to callers

pub mod context;
pub mod coordinator;

pub use context::AppContext;
pub use coordinator::SessionCoordinator;
