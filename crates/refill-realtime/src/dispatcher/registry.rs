//! Handler registry and dispatch.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, error, warn};
use uuid::Uuid;

use refill_core::result::AppResult;

use crate::message::EventEnvelope;

use super::handler::EventHandler;
use super::subscription::Subscription;

/// One handler registered for one event type.
#[derive(Clone)]
struct Registration {
    id: Uuid,
    handler: Arc<dyn EventHandler>,
}

/// Shared registry state.
#[derive(Default)]
pub(crate) struct DispatcherInner {
    /// Event type → registrations in registration order.
    handlers: DashMap<String, Vec<Registration>>,
}

impl DispatcherInner {
    pub(crate) fn remove(&self, event_type: &str, id: Uuid) -> bool {
        let mut removed = false;
        if let Some(mut regs) = self.handlers.get_mut(event_type) {
            let before = regs.len();
            regs.retain(|r| r.id != id);
            removed = regs.len() != before;
            if regs.is_empty() {
                drop(regs);
                self.handlers.remove_if(event_type, |_, regs| regs.is_empty());
            }
        }
        if removed {
            debug!(event_type, subscription_id = %id, "Handler unsubscribed");
        }
        removed
    }
}

/// Routes each event to every handler registered for its type.
///
/// Cloning is cheap; clones share one registry.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    inner: Arc<DispatcherInner>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("event_types", &self.inner.handlers.len())
            .finish()
    }
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event_type`.
    ///
    /// Registering the same handler instance for the same type again
    /// returns the existing registration.
    pub fn subscribe(
        &self,
        event_type: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Subscription {
        let event_type = event_type.into();
        let mut regs = self.inner.handlers.entry(event_type.clone()).or_default();

        let existing = regs
            .iter()
            .find(|r| Arc::ptr_eq(&r.handler, &handler))
            .map(|r| r.id);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                regs.push(Registration { id, handler });
                debug!(event_type = %event_type, subscription_id = %id, "Handler subscribed");
                id
            }
        };
        drop(regs);

        Subscription::new(id, event_type, Arc::downgrade(&self.inner))
    }

    /// Register a closure for `event_type`.
    pub fn subscribe_fn<F>(&self, event_type: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&EventEnvelope) -> AppResult<()> + Send + Sync + 'static,
    {
        self.subscribe(event_type, Arc::new(handler))
    }

    /// Register one handler for each type in `event_types`.
    pub fn subscribe_many<I, S>(&self, event_types: I, handler: Arc<dyn EventHandler>) -> Vec<Subscription>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        event_types
            .into_iter()
            .map(|event_type| self.subscribe(event_type, Arc::clone(&handler)))
            .collect()
    }

    /// Invoke every handler registered for the envelope's type, in
    /// registration order. Returns the number of handlers invoked.
    pub fn dispatch(&self, envelope: &EventEnvelope) -> usize {
        self.dispatch_as(envelope.event_type(), envelope)
    }

    /// Dispatch `envelope` to the handlers registered under `key`.
    pub(crate) fn dispatch_as(&self, key: &str, envelope: &EventEnvelope) -> usize {
        // Snapshot so handlers may subscribe or unsubscribe while running.
        let handlers: Vec<Registration> = match self.inner.handlers.get(key) {
            Some(regs) => regs.clone(),
            None => return 0,
        };

        for reg in &handlers {
            match catch_unwind(AssertUnwindSafe(|| reg.handler.handle(envelope))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        event_type = envelope.event_type(),
                        subscription_id = %reg.id,
                        error = %e,
                        "Event handler failed"
                    );
                }
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(
                        event_type = envelope.event_type(),
                        subscription_id = %reg.id,
                        panic = %message,
                        "Event handler panicked"
                    );
                }
            }
        }

        handlers.len()
    }

    /// Number of handlers registered for `event_type`.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.inner
            .handlers
            .get(event_type)
            .map(|regs| regs.len())
            .unwrap_or(0)
    }

    /// Total number of registrations.
    pub fn total_handlers(&self) -> usize {
        self.inner.handlers.iter().map(|e| e.value().len()).sum()
    }

    /// Remove every registration.
    pub fn clear(&self) {
        let count = self.total_handlers();
        self.inner.handlers.clear();
        if count > 0 {
            debug!(count, "Cleared event subscriptions");
        }
    }
}
