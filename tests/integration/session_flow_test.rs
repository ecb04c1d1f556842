//! Integration tests for the token lifecycle and session coordination.

mod helpers;

use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use refill_auth::MemoryCredentialStorage;
use refill_core::types::UserRole;
use refill_realtime::ConnectionState;
use refill_realtime::connection::WireMessage;

use helpers::{CountingRefresher, TestApp, settle, stored, test_config};

#[tokio::test(start_paused = true)]
async fn test_concurrent_refreshes_share_one_call() {
    let app = TestApp::build(
        test_config(),
        MemoryCredentialStorage::new(),
        CountingRefresher::issuing("access-2", "refresh-2"),
    );
    app.login("access-1", chrono::Duration::days(30)).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let store = app.context.token_store.clone();
        tasks.push(tokio::spawn(async move { store.refresh_session().await }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().as_deref(), Some("access-2"));
    }

    assert_eq!(app.refresher.calls(), 1);
    assert!(!app.context.token_store.is_refreshing());
    assert_eq!(app.storage.snapshot().unwrap().access_token, "access-2");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_refreshes_all_fail_together() {
    let app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let store = app.context.token_store.clone();
        tasks.push(tokio::spawn(async move { store.refresh_session().await }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), None);
    }

    assert_eq!(app.refresher.calls(), 1);
    assert!(!app.context.token_store.is_authenticated());
    assert!(app.storage.snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_check_auth_near_expiry_renews_in_background() {
    let app = TestApp::build(
        test_config(),
        MemoryCredentialStorage::new(),
        CountingRefresher::issuing("access-2", "refresh-2"),
    );
    app.context
        .token_store
        .login("T1", "R1", Utc::now() + chrono::Duration::hours(1), UserRole::User)
        .await
        .unwrap();

    app.context.token_store.check_auth().await;

    let session = app.context.token_store.session();
    assert!(session.is_authenticated);
    assert_eq!(session.access_token.as_deref(), Some("T1"));
    assert!(app.context.token_store.is_refreshing());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(app.refresher.calls(), 1);
    assert_eq!(app.context.token_store.access_token().as_deref(), Some("access-2"));
    assert!(app.context.token_store.session().last_refresh_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_check_auth_far_from_expiry_does_not_refresh() {
    let storage = MemoryCredentialStorage::with_record(stored(
        "T1",
        "R1",
        Utc::now() + chrono::Duration::days(20),
    ));
    let app = TestApp::build(test_config(), storage, CountingRefresher::issuing("x", "y"));

    app.context.token_store.check_auth().await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(app.context.token_store.is_authenticated());
    assert_eq!(app.refresher.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_check_auth_expired_and_refresh_fails_clears_storage() {
    let storage = MemoryCredentialStorage::with_record(stored(
        "T1",
        "R1",
        Utc::now() - chrono::Duration::seconds(1),
    ));
    let app = TestApp::build(test_config(), storage, CountingRefresher::failing());

    app.context.token_store.check_auth().await;

    assert_eq!(app.refresher.calls(), 1);
    let session = app.context.token_store.session();
    assert!(!session.is_authenticated);
    assert!(session.access_token.is_none());
    assert!(session.refresh_token.is_none());
    assert!(app.storage.snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_check_auth_expired_and_refresh_succeeds() {
    let storage = MemoryCredentialStorage::with_record(stored(
        "T1",
        "R1",
        Utc::now() - chrono::Duration::seconds(1),
    ));
    let app = TestApp::build(
        test_config(),
        storage,
        CountingRefresher::issuing("access-2", "refresh-2"),
    );

    app.context.token_store.check_auth().await;

    assert!(app.context.token_store.is_authenticated());
    assert_eq!(app.context.token_store.access_token().as_deref(), Some("access-2"));
    let record = app.storage.snapshot().unwrap();
    assert_eq!(record.refresh_token, "refresh-2");
    assert_eq!(record.role, "user");
}

#[tokio::test(start_paused = true)]
async fn test_cashier_login_reads_cafe_claim() {
    let app = TestApp::new();
    let token = helpers::access_token(json!({ "sub": 17, "role": "cashier", "cafe_id": "cafe-9" }));

    app.context
        .token_store
        .login(&token, "R1", Utc::now() + chrono::Duration::days(30), UserRole::Cashier)
        .await
        .unwrap();

    let session = app.context.token_store.session();
    assert_eq!(session.role, Some(UserRole::Cashier));
    assert_eq!(session.cafe_id.as_deref(), Some("cafe-9"));
    assert_eq!(app.storage.snapshot().unwrap().role, "cashier");
}

#[tokio::test(start_paused = true)]
async fn test_login_opens_stream_and_logout_closes_it() {
    let mut app = TestApp::new();
    app.context.coordinator.start();

    app.login("access-1", chrono::Duration::days(30)).await;
    let mut peer = app.accept_stream().await;
    assert!(peer.url.ends_with("token=access-1"));
    assert_eq!(app.context.connection.state(), ConnectionState::Open);

    app.context.token_store.logout().await;
    assert!(matches!(
        peer.from_client.recv().await,
        Some(WireMessage::Close { code: 1000, .. })
    ));

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(app.connector.attempts(), 1);
    let snapshot = app.context.connection.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Idle);
    assert!(!snapshot.reconnect_scheduled);
    assert!(!snapshot.heartbeat_active);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_logout_login_leaves_one_live_connection() {
    let mut app = TestApp::new();
    app.context.coordinator.start();

    app.login("access-1", chrono::Duration::days(30)).await;
    let first = app.accept_stream().await;

    app.context.token_store.logout().await;
    app.login("access-2", chrono::Duration::days(30)).await;

    let second = app.accept_stream().await;
    assert!(second.url.ends_with("token=access-2"));
    drop(first);

    tokio::time::sleep(Duration::from_secs(95)).await;
    assert_eq!(app.connector.attempts(), 2);
    assert_eq!(app.context.connection.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_closes_stream() {
    let mut app = TestApp::new();
    app.context.coordinator.start();
    app.login("access-1", chrono::Duration::days(30)).await;
    let mut peer = app.accept_stream().await;

    assert_eq!(app.context.token_store.refresh_session().await, None);

    assert!(matches!(
        peer.from_client.recv().await,
        Some(WireMessage::Close { code: 1000, .. })
    ));
    settle().await;
    assert_eq!(app.context.connection.state(), ConnectionState::Idle);
}
