//! Subscription handle returned by the dispatcher.

use std::sync::Weak;

use uuid::Uuid;

use super::registry::DispatcherInner;

/// Removes exactly the registration it was returned for.
///
/// Dropping the handle does not unsubscribe.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Registration id.
    id: Uuid,
    /// Event type key.
    event_type: String,
    /// Owning registry.
    registry: Weak<DispatcherInner>,
}

impl Subscription {
    pub(crate) fn new(id: Uuid, event_type: String, registry: Weak<DispatcherInner>) -> Self {
        Self {
            id,
            event_type,
            registry,
        }
    }

    /// Registration id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Event type the registration listens to.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Remove the registration. Calling this again, or after the dispatcher
    /// was cleared, is a no-op. Returns whether a registration was removed.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(&self.event_type, self.id),
            None => false,
        }
    }
}
