//! Drives the event connection from session transitions.
//!
//! One watcher task observes the session and is the only caller of
//! `connect()`/`disconnect()` on its behalf, so transitions are applied one
//! at a time and in order. Both calls settle synchronously, so a disconnect
//! has cancelled its timers before the next connect runs.

use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use refill_auth::TokenStore;
use refill_realtime::EventConnection;

/// The part of the session the coordinator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observed {
    authenticated: bool,
    epoch: u64,
}

/// What a transition requires of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Connect,
    Disconnect,
    Reconnect,
}

fn action_for(previous: Option<Observed>, current: Observed) -> Action {
    match previous {
        None if current.authenticated => Action::Connect,
        None => Action::None,
        Some(prev) => match (prev.authenticated, current.authenticated) {
            (false, true) => Action::Connect,
            (true, false) => Action::Disconnect,
            (true, true) if prev.epoch != current.epoch => Action::Reconnect,
            _ => Action::None,
        },
    }
}

/// Opens the event connection while the session is authenticated.
pub struct SessionCoordinator {
    token_store: TokenStore,
    connection: EventConnection,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("running", &self.is_running())
            .field("connection", &self.connection)
            .finish()
    }
}

impl SessionCoordinator {
    /// Create a stopped coordinator.
    pub fn new(token_store: TokenStore, connection: EventConnection) -> Self {
        Self {
            token_store,
            connection,
            watcher: Mutex::new(None),
        }
    }

    /// Start watching the session. Reacts to the current state right away.
    /// Calling this while running does nothing.
    pub fn start(&self) {
        let mut watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if watcher.is_some() {
            return;
        }

        let mut sessions = self.token_store.subscribe();
        let connection = self.connection.clone();
        *watcher = Some(tokio::spawn(async move {
            let mut previous = None;
            loop {
                let current = {
                    let session = sessions.borrow_and_update();
                    Observed {
                        authenticated: session.is_authenticated,
                        epoch: session.epoch,
                    }
                };

                match action_for(previous, current) {
                    Action::None => {}
                    Action::Connect => {
                        info!(epoch = current.epoch, "Session authenticated, connecting");
                        connection.connect();
                    }
                    Action::Disconnect => {
                        info!(epoch = current.epoch, "Session ended, disconnecting");
                        connection.disconnect();
                    }
                    Action::Reconnect => {
                        info!(epoch = current.epoch, "New session, reconnecting");
                        connection.disconnect();
                        connection.connect();
                    }
                }
                previous = Some(current);

                if sessions.changed().await.is_err() {
                    debug!("Session source dropped, coordinator stopping");
                    break;
                }
            }
        }));
        debug!("Session coordinator started");
    }

    /// Stop watching and disconnect.
    pub fn stop(&self) {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.abort();
            debug!("Session coordinator stopped");
        }
        self.connection.disconnect();
    }

    /// Whether the watcher task is running.
    pub fn is_running(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|w| !w.is_finished())
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        if let Some(watcher) = self
            .watcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            watcher.abort();
        }
    }
}
