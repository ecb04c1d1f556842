//! Application context owning the session and event services.
//!
//! Everything is constructed explicitly here and handed out by handle;
//! no component looks another up through global state.

use std::sync::Arc;

use tracing::info;

use refill_auth::{FileCredentialStorage, TokenStore};
use refill_core::config::AppConfig;
use refill_core::result::AppResult;
use refill_core::traits::{CredentialStorage, SessionAuthority, TokenRefresher};
use refill_http::{AuthenticatedRequestExecutor, HttpTokenRefresher, HttpTransport, ReqwestTransport};
use refill_realtime::{Connector, EventConnection, EventDispatcher, TungsteniteConnector};

use crate::coordinator::SessionCoordinator;

/// The client's service graph.
///
/// Cheap handles: the token store, executor, dispatcher and connection are
/// all clones sharing state with the ones the coordinator drives.
#[derive(Debug, Clone)]
pub struct AppContext {
    // ── Configuration ────────────────────────────────────────
    /// Client configuration
    pub config: Arc<AppConfig>,

    // ── Session ──────────────────────────────────────────────
    /// Token lifecycle
    pub token_store: TokenStore,
    /// Authenticated REST calls
    pub executor: AuthenticatedRequestExecutor,

    // ── Realtime ─────────────────────────────────────────────
    /// Typed event subscriptions
    pub dispatcher: EventDispatcher,
    /// The event stream connection
    pub connection: EventConnection,
    /// Opens and closes the connection with the session
    pub coordinator: Arc<SessionCoordinator>,
}

impl AppContext {
    /// Build the production graph: file-backed credentials, reqwest for
    /// HTTP and tokio-tungstenite for the event stream.
    pub fn build(config: AppConfig) -> AppResult<Self> {
        let storage: Arc<dyn CredentialStorage> =
            Arc::new(FileCredentialStorage::new(&config.auth.credentials_path));
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(config.http.request_timeout())?);
        let refresher: Arc<dyn TokenRefresher> = Arc::new(HttpTokenRefresher::new(
            Arc::clone(&transport),
            &config.http.base_url,
            &config.auth.refresh_path,
        ));
        let connector: Arc<dyn Connector> = Arc::new(TungsteniteConnector::new());

        info!(
            base_url = %config.http.base_url,
            realtime_url = %config.realtime.url,
            credentials = %config.auth.credentials_path,
            "Building client context"
        );
        Ok(Self::with_parts(config, storage, transport, refresher, connector))
    }

    /// Build the graph around injected seams.
    pub fn with_parts(
        config: AppConfig,
        storage: Arc<dyn CredentialStorage>,
        transport: Arc<dyn HttpTransport>,
        refresher: Arc<dyn TokenRefresher>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let token_store = TokenStore::new(storage, refresher, config.auth.clone());
        let authority: Arc<dyn SessionAuthority> = Arc::new(token_store.clone());

        let executor =
            AuthenticatedRequestExecutor::new(transport, Arc::clone(&authority), config.http.clone());

        let dispatcher = EventDispatcher::new();
        let connection = EventConnection::new(
            config.realtime.clone(),
            authority,
            connector,
            dispatcher.clone(),
        );
        let coordinator = Arc::new(SessionCoordinator::new(token_store.clone(), connection.clone()));

        Self {
            config: Arc::new(config),
            token_store,
            executor,
            dispatcher,
            connection,
            coordinator,
        }
    }
}
