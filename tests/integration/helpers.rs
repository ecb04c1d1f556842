//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use refill_auth::MemoryCredentialStorage;
use refill_core::config::AppConfig;
use refill_core::error::AppError;
use refill_core::result::AppResult;
use refill_core::traits::TokenRefresher;
use refill_core::types::{RefreshedTokens, StoredCredentials, UserRole};
use refill_http::{HttpRequest, HttpResponse, HttpTransport};
use refill_realtime::{MemoryConnector, MemoryPeer};
use refill_session::AppContext;

/// HTTP transport replaying a queue of scripted replies.
///
/// Once the script is exhausted every request gets `200 {}`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<AppResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Queue a JSON reply.
    pub fn reply(&self, status: u16, body: Value) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::json(status, &body)));
    }

    /// Queue a transport failure.
    pub fn fail(&self) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(AppError::transport("Connection reset by peer")));
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::json(200, &json!({}))))
    }
}

/// Refresh endpoint double counting its calls.
#[derive(Debug)]
pub struct CountingRefresher {
    calls: AtomicUsize,
    latency: Duration,
    outcome: Mutex<Option<RefreshedTokens>>,
}

impl CountingRefresher {
    /// A refresher that always fails.
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            latency: Duration::from_millis(50),
            outcome: Mutex::new(None),
        }
    }

    /// A refresher that issues `access` / `refresh`, valid for 30 days.
    pub fn issuing(access: &str, refresh: &str) -> Self {
        let refresher = Self::failing();
        refresher.set_tokens(access, refresh);
        refresher
    }

    /// Issue `access` / `refresh` from now on.
    pub fn set_tokens(&self, access: &str, refresh: &str) {
        *self.outcome.lock().unwrap() = Some(RefreshedTokens {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_at: Utc::now() + chrono::Duration::days(30),
        });
    }

    /// Number of refresh calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for CountingRefresher {
    async fn refresh(&self, _refresh_token: &str) -> AppResult<RefreshedTokens> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.outcome
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::unauthorized("Refresh token revoked"))
    }
}

/// Test application context
pub struct TestApp {
    /// The wired services
    pub context: AppContext,
    /// Durable credentials
    pub storage: Arc<MemoryCredentialStorage>,
    /// HTTP double
    pub transport: Arc<ScriptedTransport>,
    /// Refresh endpoint double
    pub refresher: Arc<CountingRefresher>,
    /// Event stream double
    pub connector: Arc<MemoryConnector>,
    /// Server sides of opened event transports
    pub peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Configuration pointed at test hosts.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.http.base_url = "https://api.test/v1".to_string();
    config.realtime.url = "wss://events.test/ws/connect".to_string();
    config
}

impl TestApp {
    /// Create a test application with empty storage and a failing refresher.
    pub fn new() -> Self {
        Self::build(test_config(), MemoryCredentialStorage::new(), CountingRefresher::failing())
    }

    /// Create a test application from explicit parts.
    pub fn build(
        config: AppConfig,
        storage: MemoryCredentialStorage,
        refresher: CountingRefresher,
    ) -> Self {
        let storage = Arc::new(storage);
        let transport = Arc::new(ScriptedTransport::default());
        let refresher = Arc::new(refresher);
        let (connector, peers) = MemoryConnector::new();
        let connector = Arc::new(connector);

        let context = AppContext::with_parts(
            config,
            storage.clone(),
            transport.clone(),
            refresher.clone(),
            connector.clone(),
        );

        Self {
            context,
            storage,
            transport,
            refresher,
            connector,
            peers,
        }
    }

    /// Log in as a user whose access token expires in `valid_for`.
    pub async fn login(&self, access_token: &str, valid_for: chrono::Duration) {
        self.context
            .token_store
            .login(access_token, "refresh-1", Utc::now() + valid_for, UserRole::User)
            .await
            .expect("Login failed");
    }

    /// Open the event stream and complete the handshake.
    pub async fn open_stream(&mut self) -> MemoryPeer {
        self.context.connection.connect();
        self.accept_stream().await
    }

    /// Accept the next transport and complete the handshake.
    pub async fn accept_stream(&mut self) -> MemoryPeer {
        let mut peer = self.peers.recv().await.expect("No transport opened");
        peer.send_json(&json!({ "type": "connection_established" }));
        let auth = peer.recv_json().await.expect("No authenticate frame");
        assert_eq!(auth["type"], "authenticate");
        peer
    }
}

/// A stored credential record expiring at `expires_at`.
pub fn stored(access: &str, refresh: &str, expires_at: DateTime<Utc>) -> StoredCredentials {
    StoredCredentials::new(access, refresh, expires_at, UserRole::User)
}

/// An unsigned access token carrying `claims`.
pub fn access_token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// Let spawned tasks run without advancing the clock.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
