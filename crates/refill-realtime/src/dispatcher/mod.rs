//! Type-keyed event fan-out.

pub mod awaiter;
pub mod handler;
pub mod registry;
pub mod subscription;

pub use awaiter::{Confirmation, ConfirmationRequest, await_confirmation};
pub use handler::EventHandler;
pub use registry::EventDispatcher;
pub use subscription::Subscription;
