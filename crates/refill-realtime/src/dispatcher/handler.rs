//! Event handler trait.

use refill_core::result::AppResult;

use crate::message::EventEnvelope;

/// A subscriber callback.
///
/// Returned errors and panics are caught at the dispatch boundary and never
/// reach sibling handlers or the connection.
pub trait EventHandler: Send + Sync + 'static {
    /// Handle one event.
    fn handle(&self, event: &EventEnvelope) -> AppResult<()>;
}

impl<F> EventHandler for F
where
    F: Fn(&EventEnvelope) -> AppResult<()> + Send + Sync + 'static,
{
    fn handle(&self, event: &EventEnvelope) -> AppResult<()> {
        self(event)
    }
}
