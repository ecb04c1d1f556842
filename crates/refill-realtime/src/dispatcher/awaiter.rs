//! Waiting for a confirming event after starting a payment or card flow.
//!
//! A timeout resolves to [`Confirmation::Pending`], which is not success:
//! callers must follow up with a status query before telling the user the
//! payment went through.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::message::EventEnvelope;
use crate::message::types::event_types;

use super::registry::EventDispatcher;

/// Predicate selecting the event that belongs to the flow being awaited.
pub type EventMatcher = Arc<dyn Fn(&EventEnvelope) -> bool + Send + Sync>;

/// Outcome of a confirmation wait.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    /// A success event arrived.
    Confirmed(EventEnvelope),
    /// A failure event arrived.
    Rejected(EventEnvelope),
    /// Nothing arrived in time, or subscriptions were cleared by a
    /// disconnect. The outcome is unknown.
    Pending,
}

impl Confirmation {
    /// Whether a success event arrived.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// What to wait for.
#[derive(Clone)]
pub struct ConfirmationRequest {
    /// Event types that confirm the flow.
    pub success: Vec<String>,
    /// Event types that reject the flow.
    pub failure: Vec<String>,
    /// Optional filter; events it rejects are ignored.
    pub matcher: Option<EventMatcher>,
    /// How long to wait.
    pub timeout: Duration,
}

impl std::fmt::Debug for ConfirmationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationRequest")
            .field("success", &self.success)
            .field("failure", &self.failure)
            .field("has_matcher", &self.matcher.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConfirmationRequest {
    /// Wait for an order payment: the backend announces the paid order with
    /// `order.created`.
    pub fn order_payment(timeout: Duration) -> Self {
        Self {
            success: vec![event_types::ORDER_CREATED.to_string()],
            failure: Vec::new(),
            matcher: None,
            timeout,
        }
    }

    /// Wait for a subscription payment.
    pub fn subscription_payment(timeout: Duration) -> Self {
        Self {
            success: vec![event_types::SUBSCRIPTION_PAID.to_string()],
            failure: vec![event_types::SUBSCRIPTION_PAYMENT_FAILED.to_string()],
            matcher: None,
            timeout,
        }
    }

    /// Wait for a card to be saved.
    pub fn card_save(timeout: Duration) -> Self {
        Self {
            success: vec![event_types::CARD_SAVED.to_string()],
            failure: vec![event_types::CARD_SAVE_FAILED.to_string()],
            matcher: None,
            timeout,
        }
    }

    /// Only accept events for which `matcher` returns true.
    pub fn with_matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&EventEnvelope) -> bool + Send + Sync + 'static,
    {
        self.matcher = Some(Arc::new(matcher));
        self
    }
}

enum Outcome {
    Success(EventEnvelope),
    Failure(EventEnvelope),
}

/// Subscribe to the request's event types and wait for the first matching
/// one. Subscriptions are removed before returning.
pub async fn await_confirmation(
    dispatcher: &EventDispatcher,
    request: ConfirmationRequest,
) -> Confirmation {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut subscriptions = Vec::new();

    for event_type in &request.success {
        let tx = tx.clone();
        subscriptions.push(dispatcher.subscribe_fn(event_type.clone(), move |event| {
            let _ = tx.send(Outcome::Success(event.clone()));
            Ok(())
        }));
    }
    for event_type in &request.failure {
        let tx = tx.clone();
        subscriptions.push(dispatcher.subscribe_fn(event_type.clone(), move |event| {
            let _ = tx.send(Outcome::Failure(event.clone()));
            Ok(())
        }));
    }
    drop(tx);

    let matcher = request.matcher.clone();
    let wait = async {
        while let Some(outcome) = rx.recv().await {
            let event = match &outcome {
                Outcome::Success(e) | Outcome::Failure(e) => e,
            };
            if matcher.as_ref().is_none_or(|m| m(event)) {
                return Some(outcome);
            }
            debug!(event_type = event.event_type(), "Ignoring unrelated event");
        }
        None
    };

    let result = tokio::time::timeout(request.timeout, wait).await;

    for subscription in &subscriptions {
        subscription.unsubscribe();
    }

    match result {
        Ok(Some(Outcome::Success(event))) => {
            info!(event_type = event.event_type(), "Flow confirmed");
            Confirmation::Confirmed(event)
        }
        Ok(Some(Outcome::Failure(event))) => {
            info!(event_type = event.event_type(), "Flow rejected");
            Confirmation::Rejected(event)
        }
        Ok(None) => {
            warn!("Subscriptions cleared before confirmation; outcome unknown");
            Confirmation::Pending
        }
        Err(_) => {
            warn!(
                timeout_secs = request.timeout.as_secs(),
                "No confirmation received; outcome unknown, follow-up status query required"
            );
            Confirmation::Pending
        }
    }
}
