//! Integration tests for authenticated requests against the token store.

mod helpers;

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use refill_auth::MemoryCredentialStorage;
use refill_core::ErrorKind;
use refill_http::RequestSpec;

use helpers::{CountingRefresher, TestApp, test_config};

fn app_with_refresh() -> TestApp {
    TestApp::build(
        test_config(),
        MemoryCredentialStorage::new(),
        CountingRefresher::issuing("access-2", "refresh-2"),
    )
}

#[tokio::test(start_paused = true)]
async fn test_bearer_token_is_attached() {
    let app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    app.transport.reply(200, json!({ "balance": 3 }));

    let body = app
        .context
        .executor
        .execute(&RequestSpec::get("/users/me/subscription"), true)
        .await
        .unwrap();

    assert_eq!(body["balance"], 3);
    let request = &app.transport.requests()[0];
    assert_eq!(request.url, "https://api.test/v1/users/me/subscription");
    assert_eq!(request.header("authorization"), Some("Bearer access-1"));
    assert_eq!(request.header("content-type"), Some("application/json"));
}

#[tokio::test(start_paused = true)]
async fn test_unauthenticated_request_has_no_bearer() {
    let app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;

    app.context
        .executor
        .execute(&RequestSpec::get("/cafes"), false)
        .await
        .unwrap();

    assert!(app.transport.requests()[0].header("authorization").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_token_is_refreshed_and_retried_once() {
    let app = app_with_refresh();
    app.login("access-1", chrono::Duration::days(30)).await;
    app.transport.reply(401, json!({ "message": "Token expired" }));
    app.transport.reply(200, json!({ "id": "o-1" }));

    let body = app
        .context
        .executor
        .execute(&RequestSpec::get("/orders/o-1"), true)
        .await
        .unwrap();

    assert_eq!(body["id"], "o-1");
    assert_eq!(app.refresher.calls(), 1);
    let requests = app.transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].header("authorization"), Some("Bearer access-2"));
}

#[tokio::test(start_paused = true)]
async fn test_second_rejection_expires_session() {
    let app = app_with_refresh();
    app.login("access-1", chrono::Duration::days(30)).await;
    app.transport.reply(401, json!({ "message": "Token expired" }));
    app.transport.reply(401, json!({ "message": "Token expired" }));

    let err = app
        .context
        .executor
        .execute(&RequestSpec::get("/orders"), true)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::SessionExpired);
    assert_eq!(err.status, Some(401));
    assert_eq!(app.transport.request_count(), 2);
    assert_eq!(app.refresher.calls(), 1);
    assert!(!app.context.token_store.is_authenticated());
    assert!(app.storage.snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_after_rejection_expires_session() {
    let app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    app.transport.reply(401, json!({ "message": "Token expired" }));

    let err = app
        .context
        .executor
        .execute(&RequestSpec::get("/orders"), true)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::SessionExpired);
    assert_eq!(app.transport.request_count(), 1);
    assert!(!app.context.token_store.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_missing_token_without_refresh_token_fails_without_io() {
    let app = app_with_refresh();

    let err = app
        .context
        .executor
        .execute(&RequestSpec::get("/orders"), true)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::SessionExpired);
    assert_eq!(app.transport.request_count(), 0);
    assert_eq!(app.refresher.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_rejections_share_one_refresh() {
    let app = app_with_refresh();
    app.login("access-1", chrono::Duration::days(30)).await;
    app.transport.reply(401, json!({}));
    app.transport.reply(401, json!({}));

    let spec = RequestSpec::get("/orders");
    let (a, b) = tokio::join!(
        app.context.executor.execute(&spec, true),
        app.context.executor.execute(&spec, true),
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(app.refresher.calls(), 1);
    assert_eq!(app.transport.request_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failures_are_retried_with_fixed_delay() {
    let app = TestApp::new();
    app.transport.fail();
    app.transport.fail();
    app.transport.reply(200, json!({ "ok": true }));

    let start = tokio::time::Instant::now();
    let body = app
        .context
        .executor
        .execute(&RequestSpec::get("/cafes"), false)
        .await
        .unwrap();

    assert_eq!(body["ok"], true);
    assert_eq!(app.transport.request_count(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_surfaces_after_retries() {
    let app = TestApp::new();
    for _ in 0..3 {
        app.transport.fail();
    }

    let err = app
        .context
        .executor
        .execute(&RequestSpec::get("/cafes"), false)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Transport);
    assert_eq!(app.transport.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_account_not_found_logs_out() {
    let app = app_with_refresh();
    app.login("access-1", chrono::Duration::days(30)).await;
    app.transport.reply(
        404,
        json!({ "detail": { "message": "User not found", "error_code": "USER_NOT_FOUND" } }),
    );

    let err = app
        .context
        .executor
        .execute(&RequestSpec::get("/users/me"), true)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::AccountNotFound);
    assert_eq!(err.message, "User not found");
    assert_eq!(err.code.as_deref(), Some("USER_NOT_FOUND"));
    assert_eq!(app.refresher.calls(), 0);
    assert!(!app.context.token_store.is_authenticated());
    assert!(app.storage.snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_other_errors_carry_backend_message() {
    let app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    app.transport
        .reply(422, json!({ "error": "Cafe is closed", "error_code": "CAFE_CLOSED" }));

    let err = app
        .context
        .executor
        .execute(&RequestSpec::post("/orders"), true)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Api);
    assert_eq!(err.status, Some(422));
    assert_eq!(err.message, "Cafe is closed");
    assert_eq!(err.code.as_deref(), Some("CAFE_CLOSED"));
    assert!(app.context.token_store.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_auth_endpoints_never_refresh() {
    let app = app_with_refresh();
    app.transport.reply(401, json!({ "message": "Invalid code" }));

    let spec = RequestSpec::post("/auth/confirm")
        .json(&json!({ "phone": "+70000000000", "code": "0000" }))
        .unwrap();
    let err = app.context.executor.execute(&spec, true).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.message, "Invalid code");
    assert_eq!(app.refresher.calls(), 0);
    assert_eq!(app.transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_execute_json_decodes_body() {
    #[derive(Debug, Deserialize)]
    struct Balance {
        cups: u32,
    }

    let app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    app.transport.reply(200, json!({ "cups": 4 }));

    let balance: Balance = app
        .context
        .executor
        .execute_json(&RequestSpec::get("/users/me/balance"), true)
        .await
        .unwrap();

    assert_eq!(balance.cups, 4);
}
