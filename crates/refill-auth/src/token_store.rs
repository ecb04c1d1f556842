//! Session state holder with single-flight token refresh.
//!
//! The in-memory [`Session`] lives in a `watch` channel so observers (the
//! session coordinator, UI state) react to transitions without polling.
//! Durable state goes through a [`CredentialStorage`]; the network refresh
//! call goes through a [`TokenRefresher`].
//!
//! Logout clears memory before storage. For a short window the durable
//! record may still exist while memory is already logged out; the two never
//! diverge in the other direction.
//!
//! Login and the refresh commit hold the persist lock across their storage
//! write and memory update, so a refresh can never land between a login's
//! write and its publish. A refresh commits to memory only if the session
//! epoch is unchanged; otherwise its write is undone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, error, info, warn};

use refill_core::config::AuthConfig;
use refill_core::result::AppResult;
use refill_core::traits::{CredentialStorage, SessionAuthority, TokenRefresher};
use refill_core::types::{Session, StoredCredentials, UserRole};

use crate::jwt::decode_unverified;

/// A refresh in progress, shared by every caller that joins it.
type RefreshFlight = Shared<BoxFuture<'static, Option<String>>>;

/// Durable holder of the session tokens.
///
/// Cloning is cheap; all clones share the same session.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

struct Inner {
    /// Durable credential record.
    storage: Arc<dyn CredentialStorage>,
    /// Refresh endpoint client.
    refresher: Arc<dyn TokenRefresher>,
    /// Token lifecycle settings.
    config: AuthConfig,
    /// Current session; receivers observe every transition.
    state: watch::Sender<Session>,
    /// The in-flight refresh, if any.
    flight: Mutex<Option<RefreshFlight>>,
    /// Serializes storage writes with the memory update that follows them.
    persist: AsyncMutex<()>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.inner.state.borrow();
        f.debug_struct("TokenStore")
            .field("is_authenticated", &session.is_authenticated)
            .field("role", &session.role)
            .field("epoch", &session.epoch)
            .field("storage", &self.inner.storage)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TokenStore {
    /// Create a store with an empty, unauthenticated session.
    pub fn new(
        storage: Arc<dyn CredentialStorage>,
        refresher: Arc<dyn TokenRefresher>,
        config: AuthConfig,
    ) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            inner: Arc::new(Inner {
                storage,
                refresher,
                config,
                state,
                flight: Mutex::new(None),
                persist: AsyncMutex::new(()),
            }),
        }
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Observe session transitions.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Cached access token. Never performs I/O.
    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    /// Whether the session is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        lock(&self.inner.flight).is_some()
    }

    /// Establish a new session.
    ///
    /// The four keys are persisted first; a storage failure fails the call
    /// and leaves the in-memory session untouched.
    pub async fn login(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
        role: UserRole,
    ) -> AppResult<()> {
        let mut next = Session {
            access_token: Some(access_token.to_string()),
            refresh_token: Some(refresh_token.to_string()),
            expires_at: Some(expires_at),
            role: Some(role),
            cafe_id: cafe_id_for(role, access_token),
            ..Session::default()
        };
        next.is_authenticated = !next.is_expired_at(Utc::now());
        if !next.is_authenticated {
            warn!(expires_at = %expires_at, "Login received an already expired access token");
        }

        let _persist = self.inner.persist.lock().await;
        let record = StoredCredentials::new(access_token, refresh_token, expires_at, role);
        self.inner.storage.save(&record).await?;

        self.inner.state.send_modify(|session| {
            next.epoch = session.epoch + 1;
            *session = next;
        });

        info!(role = %role, expires_at = %expires_at, "Session established");
        Ok(())
    }

    /// End the session.
    ///
    /// Memory is cleared immediately; clearing durable storage is best
    /// effort and its failure is only logged.
    pub async fn logout(&self) {
        self.inner.state.send_modify(|session| {
            *session = Session {
                epoch: session.epoch + 1,
                ..Session::default()
            };
        });
        info!("Session cleared");

        if let Err(e) = self.inner.storage.clear().await {
            warn!(error = %e, "Failed to clear stored credentials after logout");
        }
    }

    /// Restore the session from durable storage at startup.
    ///
    /// An expired (or unreadable) expiry is refreshed before returning. A
    /// valid token close to expiry is renewed in the background while the
    /// session is marked authenticated immediately.
    pub async fn check_auth(&self) {
        let record = match self.inner.storage.load().await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to load stored credentials");
                None
            }
        };

        let Some(record) = record else {
            debug!("No stored credentials");
            self.invalidate().await;
            return;
        };

        let role = record.role.parse::<UserRole>().ok();
        let (Some(role), false, false) = (
            role,
            record.access_token.is_empty(),
            record.refresh_token.is_empty(),
        ) else {
            warn!("Stored credentials are incomplete, clearing");
            self.invalidate().await;
            return;
        };

        let expires_at = record.expiry();
        let now = Utc::now();
        let mut restored = Session {
            access_token: Some(record.access_token.clone()),
            cafe_id: cafe_id_for(role, &record.access_token),
            refresh_token: Some(record.refresh_token),
            expires_at,
            role: Some(role),
            ..Session::default()
        };
        let valid = !restored.is_expired_at(now);
        restored.is_authenticated = valid;

        self.inner.state.send_modify(|session| {
            restored.epoch = session.epoch + 1;
            *session = restored;
        });

        if !valid {
            info!("Stored access token expired, refreshing");
            if self.refresh_session().await.is_none() {
                self.invalidate().await;
            }
            return;
        }

        info!(role = %role, "Session restored");
        if let Some(expires_at) = expires_at
            && expires_at - now < self.inner.config.refresh_window()
        {
            info!(expires_at = %expires_at, "Access token close to expiry, renewing in background");
            let _ = self.flight();
        }
    }

    /// Single-flight refresh.
    ///
    /// The first caller starts the network refresh and waits for it.
    /// Callers arriving while it runs join the same result, waiting at most
    /// `refresh_join_timeout_ms`; a joiner that gives up gets `None` and
    /// never starts a second refresh.
    pub async fn refresh_session(&self) -> Option<String> {
        let (flight, joined) = self.flight();
        if !joined {
            return flight.await;
        }

        debug!("Joining in-flight token refresh");
        let timeout = self.inner.config.refresh_join_timeout();
        match tokio::time::timeout(timeout, flight).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Timed out waiting for in-flight token refresh"
                );
                None
            }
        }
    }

    /// Return the current flight, starting one if none is running. The
    /// flag is `true` when an existing flight was joined.
    fn flight(&self) -> (RefreshFlight, bool) {
        let mut slot = lock(&self.inner.flight);
        if let Some(flight) = slot.as_ref() {
            return (flight.clone(), true);
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let result = inner.perform_refresh().await;
            *lock(&inner.flight) = None;
            result
        });

        let flight = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "Token refresh task failed");
                    None
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(flight.clone());
        (flight, false)
    }

    /// Clear memory and storage after an unrecoverable session loss.
    async fn invalidate(&self) {
        self.inner.invalidate().await;
    }
}

impl Inner {
    async fn perform_refresh(&self) -> Option<String> {
        let current = self.state.borrow().clone();
        let Some(refresh_token) = current.refresh_token.clone() else {
            warn!("Refresh requested without a refresh token");
            return None;
        };

        let tokens = match self.refresher.refresh(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Token refresh rejected");
                if self.state.borrow().epoch == current.epoch {
                    self.invalidate().await;
                }
                return None;
            }
        };

        let _persist = self.persist.lock().await;
        if self.state.borrow().epoch != current.epoch {
            info!("Session changed during refresh, discarding refreshed tokens");
            return None;
        }

        let role = current.role.unwrap_or(UserRole::User);
        let record = StoredCredentials::new(
            &tokens.access_token,
            &tokens.refresh_token,
            tokens.expires_at,
            role,
        );
        if let Err(e) = self.storage.save(&record).await {
            error!(error = %e, "Failed to persist refreshed tokens; keeping them in memory");
        }

        let cafe_id = cafe_id_for(role, &tokens.access_token);
        let now = Utc::now();
        let committed = self.state.send_if_modified(|session| {
            if session.epoch != current.epoch {
                return false;
            }
            session.access_token = Some(tokens.access_token.clone());
            session.refresh_token = Some(tokens.refresh_token.clone());
            session.expires_at = Some(tokens.expires_at);
            session.role = Some(role);
            session.cafe_id = cafe_id;
            session.is_authenticated = true;
            session.last_refresh_at = Some(now);
            true
        });

        if !committed {
            info!("Session changed while persisting refreshed tokens, discarding them");
            self.restore_storage().await;
            return None;
        }

        info!(expires_at = %tokens.expires_at, "Token refreshed");
        Some(tokens.access_token)
    }

    /// Rewrite storage from the current session after a discarded write.
    /// Called with the persist lock held.
    async fn restore_storage(&self) {
        let credentials = self.state.borrow().credentials();
        let result = match credentials {
            Some(record) => self.storage.save(&record).await,
            None => self.storage.clear().await,
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to restore stored credentials");
        }
    }

    async fn invalidate(&self) {
        self.state.send_modify(|session| {
            if session.access_token.is_some() || session.is_authenticated {
                *session = Session {
                    epoch: session.epoch + 1,
                    ..Session::default()
                };
            }
        });
        if let Err(e) = self.storage.clear().await {
            warn!(error = %e, "Failed to clear stored credentials");
        }
    }
}

/// Cafe id claim for cashier tokens. Decode failures are logged and yield
/// `None`.
fn cafe_id_for(role: UserRole, access_token: &str) -> Option<String> {
    if role != UserRole::Cashier {
        return None;
    }
    match decode_unverified(access_token) {
        Ok(claims) => claims.cafe_id,
        Err(e) => {
            warn!(error = %e, "Failed to read cafe id from access token");
            None
        }
    }
}

#[async_trait]
impl SessionAuthority for TokenStore {
    fn access_token(&self) -> Option<String> {
        TokenStore::access_token(self)
    }

    fn is_authenticated(&self) -> bool {
        TokenStore::is_authenticated(self)
    }

    async fn refresh_session(&self) -> Option<String> {
        TokenStore::refresh_session(self).await
    }

    async fn logout(&self) {
        TokenStore::logout(self).await
    }
}
