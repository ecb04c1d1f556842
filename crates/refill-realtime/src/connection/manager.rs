//! The single persistent event connection.
//!
//! `connect()` and `disconnect()` are synchronous and never fail; the
//! socket work runs in spawned tasks. Every task carries the generation it
//! was started for and ignores itself once `disconnect()` or a newer
//! `connect()` bumped the generation, so a stale task can never reopen or
//! reschedule anything.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use refill_auth::jwt::decode_unverified;
use refill_core::config::RealtimeConfig;
use refill_core::error::{AppError, ErrorKind};
use refill_core::result::AppResult;
use refill_core::traits::SessionAuthority;

use crate::dispatcher::{EventDispatcher, Subscription};
use crate::message::{
    ClientFrame, ControlFrame, EventEnvelope, InboundFrame, parse_frame, serialize_client_frame,
};

use super::backoff::Backoff;
use super::callbacks::MessageCallbacks;
use super::heartbeat::run_heartbeat;
use super::state::{ConnectionSnapshot, ConnectionState};
use super::transport::{
    CLOSE_ABNORMAL, CLOSE_GOING_AWAY, CLOSE_NORMAL, Connector, WireEvent, WireMessage,
};

/// Close reason sent on an explicit disconnect.
const DISCONNECT_REASON: &str = "User logout or navigation";

/// Close reason sent when the heartbeat finds the transport dead.
const HEARTBEAT_FAILED_REASON: &str = "Heartbeat failed";

/// Text of the diagnostic `test` frame.
const TEST_MESSAGE: &str = "Connection test from client";

/// Owns the realtime connection: handshake, heartbeat, reconnection and
/// inbound fan-out.
///
/// Cloning is cheap; clones drive the same connection.
#[derive(Clone)]
pub struct EventConnection {
    shared: Arc<Shared>,
}

struct Shared {
    /// Connection settings.
    config: RealtimeConfig,
    /// Token source; the connection only runs while it is authenticated.
    session: Arc<dyn SessionAuthority>,
    /// Transport factory.
    connector: Arc<dyn Connector>,
    /// Typed subscribers.
    dispatcher: EventDispatcher,
    /// Raw callbacks.
    callbacks: MessageCallbacks,
    /// Mutable connection state.
    state: Mutex<LinkState>,
}

struct LinkState {
    phase: ConnectionState,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<WireMessage>>,
    backoff: Backoff,
    last_heartbeat_at: Option<chrono::DateTime<Utc>>,
    reader: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

impl LinkState {
    /// Drop the transport and stop its tasks. Handles for the calling task
    /// must be taken out beforehand so it is not aborted.
    fn teardown(&mut self) {
        for task in [self.reader.take(), self.heartbeat.take()].into_iter().flatten() {
            task.abort();
        }
        self.outbound = None;
        self.phase = ConnectionState::Idle;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl std::fmt::Debug for EventConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("EventConnection")
            .field("state", &snapshot.state)
            .field("reconnect_attempts", &snapshot.reconnect_attempts)
            .field("connector", &self.shared.connector)
            .finish()
    }
}

impl EventConnection {
    /// Create an idle connection.
    pub fn new(
        config: RealtimeConfig,
        session: Arc<dyn SessionAuthority>,
        connector: Arc<dyn Connector>,
        dispatcher: EventDispatcher,
    ) -> Self {
        let backoff = Backoff::from_config(&config);
        Self {
            shared: Arc::new(Shared {
                config,
                session,
                connector,
                dispatcher,
                callbacks: MessageCallbacks::new(),
                state: Mutex::new(LinkState {
                    phase: ConnectionState::Idle,
                    generation: 0,
                    outbound: None,
                    backoff,
                    last_heartbeat_at: None,
                    reader: None,
                    heartbeat: None,
                    reconnect: None,
                }),
            }),
        }
    }

    /// Open the connection in the background.
    ///
    /// A no-op while open or connecting, and while the session is not
    /// authenticated. Never fails; the outcome shows up in [`snapshot`]
    /// and in dispatched events.
    ///
    /// [`snapshot`]: EventConnection::snapshot
    pub fn connect(&self) {
        self.shared.connect();
    }

    /// Close the connection and cancel all timers.
    ///
    /// Idempotent and safe from any state. Sends a normal closure, resets
    /// the backoff, and clears every event subscription and raw callback.
    pub fn disconnect(&self) {
        self.shared.disconnect();
    }

    /// Send a message. Returns `false` unless the connection is open.
    pub fn send<T: Serialize>(&self, message: &T) -> bool {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize outbound message");
                return false;
            }
        };
        let st = lock(&self.shared.state);
        if st.phase != ConnectionState::Open {
            debug!(state = %st.phase, "Cannot send while not open");
            return false;
        }
        send_text(&st, text)
    }

    /// Send a diagnostic `test` frame carrying the access token's subject.
    pub fn send_test_message(&self) -> bool {
        let user_id = self
            .shared
            .session
            .access_token()
            .and_then(|token| match decode_unverified(&token) {
                Ok(claims) => claims.subject(),
                Err(e) => {
                    warn!(error = %e, "Failed to read user id for test message");
                    None
                }
            });
        self.send(&ClientFrame::Test {
            message: TEST_MESSAGE.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            user_id,
        })
    }

    /// Register a raw callback receiving every dispatched event.
    pub fn on_message<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&EventEnvelope) -> AppResult<()> + Send + Sync + 'static,
    {
        self.shared.callbacks.register(callback)
    }

    /// The typed event dispatcher fed by this connection.
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.shared.dispatcher
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> ConnectionState {
        lock(&self.shared.state).phase
    }

    /// Observable connection fields.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        let st = lock(&self.shared.state);
        ConnectionSnapshot {
            state: st.phase,
            reconnect_attempts: st.backoff.attempts(),
            reconnect_delay: st.backoff.delay(),
            last_heartbeat_at: st.last_heartbeat_at,
            reconnect_scheduled: st.reconnect.is_some(),
            heartbeat_active: st.heartbeat.is_some(),
        }
    }
}

fn send_text(st: &LinkState, text: String) -> bool {
    match st.outbound.as_ref() {
        Some(outbound) => outbound.send(WireMessage::Text(text)).is_ok(),
        None => false,
    }
}

impl Shared {
    fn connect(self: &Arc<Self>) {
        if !self.session.is_authenticated() {
            debug!("Not authenticated, skipping connect");
            return;
        }
        let Some(token) = self.session.access_token() else {
            debug!("No access token, skipping connect");
            return;
        };

        let mut st = lock(&self.state);
        if matches!(st.phase, ConnectionState::Open | ConnectionState::Connecting) {
            debug!(state = %st.phase, "Already connected or connecting");
            return;
        }

        let url = match connection_url(&self.config.url, &token) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "Invalid realtime URL");
                return;
            }
        };

        if let Some(timer) = st.reconnect.take() {
            timer.abort();
        }
        st.generation += 1;
        st.phase = ConnectionState::Connecting;
        let generation = st.generation;

        info!(generation, attempt = st.backoff.attempts(), "Connecting to event stream");
        let shared = Arc::clone(self);
        st.reader = Some(tokio::spawn(async move {
            shared.run(generation, url).await;
        }));
    }

    fn disconnect(&self) {
        let mut st = lock(&self.state);
        st.generation += 1;
        if let Some(timer) = st.reconnect.take() {
            timer.abort();
        }

        let was = st.phase;
        if let Some(outbound) = st.outbound.take() {
            st.phase = ConnectionState::Closing;
            let _ = outbound.send(WireMessage::Close {
                code: CLOSE_NORMAL,
                reason: DISCONNECT_REASON.to_string(),
            });
        }
        st.teardown();
        st.backoff.reset();
        st.last_heartbeat_at = None;
        drop(st);

        self.dispatcher.clear();
        self.callbacks.clear();
        if was != ConnectionState::Idle {
            info!(from = %was, "Disconnected from event stream");
        }
    }

    async fn run(self: Arc<Self>, generation: u64, url: String) {
        let channels = match self.connector.connect(&url).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!(error = %e, "Event stream transport failed to open");
                self.on_closed(generation, CLOSE_ABNORMAL, e.to_string());
                return;
            }
        };

        {
            let mut st = lock(&self.state);
            if st.generation != generation {
                let _ = channels.outbound.send(WireMessage::Close {
                    code: CLOSE_NORMAL,
                    reason: DISCONNECT_REASON.to_string(),
                });
                return;
            }
            st.outbound = Some(channels.outbound);
        }
        debug!(generation, "Transport open, waiting for connection_established");

        let mut inbound = channels.inbound;
        while let Some(event) = inbound.recv().await {
            match event {
                WireEvent::Text(raw) => self.on_frame(generation, &raw),
                WireEvent::Closed { code, reason } => {
                    self.on_closed(generation, code, reason);
                    return;
                }
            }
        }
        self.on_closed(generation, CLOSE_ABNORMAL, "Transport ended".to_string());
    }

    fn on_frame(self: &Arc<Self>, generation: u64, raw: &str) {
        if lock(&self.state).generation != generation {
            return;
        }

        let frame = match parse_frame(raw, self.config.max_frame_size) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, bytes = raw.len(), "Dropping malformed frame");
                return;
            }
        };

        match frame {
            InboundFrame::Control(ControlFrame::ConnectionEstablished) => {
                self.on_established(generation);
            }
            InboundFrame::Control(ControlFrame::Pong) => {
                lock(&self.state).last_heartbeat_at = Some(Utc::now());
                debug!("Pong received");
            }
            InboundFrame::Control(ControlFrame::Authenticated) => {
                info!("Event stream authenticated");
            }
            InboundFrame::Control(ControlFrame::TestResponse) => {
                debug!("Test response received");
            }
            InboundFrame::Event(envelope) => {
                let handlers = self.dispatcher.dispatch(&envelope);
                let callbacks = self.callbacks.deliver(&envelope);
                debug!(
                    event_type = envelope.event_type(),
                    handlers, callbacks, "Event dispatched"
                );
            }
        }
    }

    fn on_established(self: &Arc<Self>, generation: u64) {
        let token = self.session.access_token();
        let mut st = lock(&self.state);
        if st.generation != generation {
            return;
        }

        st.phase = ConnectionState::Open;
        st.backoff.reset();
        st.last_heartbeat_at = Some(Utc::now());

        if let Some(task) = st.heartbeat.take() {
            task.abort();
        }
        let shared = Arc::clone(self);
        let interval = self.config.heartbeat_interval();
        st.heartbeat = Some(tokio::spawn(async move {
            let sender = Arc::clone(&shared);
            run_heartbeat(interval, move |frame| sender.send_frame(generation, frame)).await;
            shared.on_heartbeat_failed(generation);
        }));

        match token {
            Some(token) => {
                let sent = serialize_client_frame(&ClientFrame::authenticate(token))
                    .map(|text| send_text(&st, text))
                    .unwrap_or(false);
                if !sent {
                    warn!("Failed to send authenticate frame");
                }
            }
            None => warn!("No access token for authenticate frame"),
        }

        info!(generation, "Event stream open");
    }

    fn send_frame(&self, generation: u64, frame: &ClientFrame) -> bool {
        let st = lock(&self.state);
        if st.generation != generation || st.phase != ConnectionState::Open {
            return false;
        }
        match serialize_client_frame(frame) {
            Ok(text) => send_text(&st, text),
            Err(e) => {
                warn!(error = %e, "Failed to serialize frame");
                false
            }
        }
    }

    /// The socket is dead: drop it and reconnect immediately, keeping
    /// subscriptions and the backoff state.
    fn on_heartbeat_failed(self: &Arc<Self>, generation: u64) {
        {
            let mut st = lock(&self.state);
            if st.generation != generation {
                return;
            }
            // Detach our own handle so teardown does not abort this task.
            st.heartbeat = None;
            if let Some(outbound) = st.outbound.take() {
                let _ = outbound.send(WireMessage::Close {
                    code: CLOSE_GOING_AWAY,
                    reason: HEARTBEAT_FAILED_REASON.to_string(),
                });
            }
            st.teardown();
        }
        warn!(generation, "Heartbeat failed, reconnecting");
        self.connect();
    }

    fn on_closed(self: &Arc<Self>, generation: u64, code: u16, reason: String) {
        let mut st = lock(&self.state);
        if st.generation != generation {
            return;
        }
        // Called from the reader task; detach it before teardown.
        st.reader = None;
        st.teardown();
        info!(code, reason = %reason, "Event stream closed");

        if code == CLOSE_NORMAL {
            return;
        }
        if !self.session.is_authenticated() {
            debug!("Session ended, not reconnecting");
            return;
        }

        let Some(delay) = st.backoff.next_delay() else {
            warn!(
                attempts = st.backoff.attempts(),
                "Giving up on event stream reconnection"
            );
            return;
        };

        info!(
            attempt = st.backoff.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Scheduling event stream reconnect"
        );
        let shared = Arc::clone(self);
        st.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut st = lock(&shared.state);
                if st.generation != generation {
                    return;
                }
                st.reconnect = None;
            }
            shared.connect();
        }));
    }
}

/// The configured URL with `token=<access token>` appended.
fn connection_url(base: &str, token: &str) -> AppResult<String> {
    let mut url = reqwest::Url::parse(base).map_err(|e| {
        AppError::with_source(
            ErrorKind::Configuration,
            format!("Invalid realtime URL: {base}"),
            e,
        )
    })?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}
