//! Raw per-call-site message callbacks.
//!
//! A secondary fan-out path: every dispatched event is also handed to each
//! callback, regardless of type, after the typed handlers ran.

use refill_core::result::AppResult;

use crate::dispatcher::{EventDispatcher, Subscription};
use crate::message::EventEnvelope;

/// Registry key shared by every callback.
const ANY_EVENT: &str = "*";

/// Registered raw callbacks.
#[derive(Debug, Clone, Default)]
pub struct MessageCallbacks {
    registry: EventDispatcher,
}

impl MessageCallbacks {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback.
    pub fn register<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&EventEnvelope) -> AppResult<()> + Send + Sync + 'static,
    {
        self.registry.subscribe_fn(ANY_EVENT, callback)
    }

    /// Hand `event` to every callback. Returns the number invoked.
    pub fn deliver(&self, event: &EventEnvelope) -> usize {
        self.registry.dispatch_as(ANY_EVENT, event)
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.registry.handler_count(ANY_EVENT)
    }

    /// Whether no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every callback.
    pub fn clear(&self) {
        self.registry.clear();
    }
}
