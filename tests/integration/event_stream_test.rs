//! Integration tests for the event stream: handshake, reconnection and
//! fan-out to subscribers.

mod helpers;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use refill_auth::MemoryCredentialStorage;
use refill_core::error::AppError;
use refill_core::result::AppResult;
use refill_core::types::Order;
use refill_realtime::connection::WireMessage;
use refill_realtime::{
    Confirmation, ConfirmationRequest, ConnectionState, DomainEvent, EventEnvelope,
    await_confirmation,
};

use helpers::{CountingRefresher, TestApp, settle, test_config};

/// Gaps between consecutive connect attempts.
fn gaps(app: &TestApp) -> Vec<Duration> {
    app.connector
        .attempt_times()
        .windows(2)
        .map(|w| w[1] - w[0])
        .collect()
}

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|s| Duration::from_secs(*s)).collect()
}

#[tokio::test(start_paused = true)]
async fn test_connect_while_unauthenticated_is_noop() {
    let app = TestApp::new();

    app.context.connection.connect();
    settle().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(app.connector.attempts(), 0);
    assert_eq!(app.context.connection.state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_order_created_reaches_every_subscriber() {
    let mut app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    let peer = app.open_stream().await;

    let received: Arc<Mutex<Vec<(Order, EventEnvelope)>>> = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..2 {
        let sink = received.clone();
        app.context.dispatcher.subscribe_fn("order.created", move |event| {
            sink.lock().unwrap().push((event.order().unwrap(), event.clone()));
            Ok(())
        });
    }
    let updates = Arc::new(Mutex::new(0));
    let counter = updates.clone();
    app.context.dispatcher.subscribe_fn("order.update", move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });

    peer.send_json(&json!({
        "type": "order.created",
        "order": {
            "id": "o-1",
            "cafeId": "cafe-1",
            "totalPrice": 1200.0,
            "status": "new",
            "coffees": []
        }
    }));
    settle().await;

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].0, received[1].0);
    assert_eq!(received[0].0.id, "o-1");
    assert_eq!(received[0].0.cafe_id, "cafe-1");
    assert!(received[0].1.same_frame(&received[1].1));
    assert!(matches!(
        received[0].1.domain_event(),
        Some(DomainEvent::OrderCreated { ref order }) if order.id == "o-1"
    ));
    assert_eq!(*updates.lock().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failing_handlers_do_not_affect_siblings() {
    let mut app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    let peer = app.open_stream().await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    app.context
        .dispatcher
        .subscribe_fn("card.save", |_| Err(AppError::handler("handler failed")));
    app.context
        .dispatcher
        .subscribe_fn("card.save", |_| -> AppResult<()> { panic!("handler panicked") });
    let sink = seen.clone();
    app.context.dispatcher.subscribe_fn("card.save", move |event| {
        sink.lock()
            .unwrap()
            .push(event.str_field("cardId").unwrap_or_default().to_string());
        Ok(())
    });

    peer.send_json(&json!({ "type": "card.save", "cardId": "k-1" }));
    peer.send_json(&json!({ "type": "card.save", "cardId": "k-2" }));
    settle().await;

    assert_eq!(*seen.lock().unwrap(), vec!["k-1".to_string(), "k-2".to_string()]);
    assert_eq!(app.context.connection.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_events_arrive_in_wire_order_on_both_paths() {
    let mut app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    let peer = app.open_stream().await;

    let typed = Arc::new(Mutex::new(Vec::new()));
    let raw = Arc::new(Mutex::new(Vec::new()));
    let sink = typed.clone();
    app.context.dispatcher.subscribe_fn("order.update", move |event| {
        sink.lock().unwrap().push(event.str_field("id").unwrap().to_string());
        Ok(())
    });
    let sink = raw.clone();
    app.context.connection.on_message(move |event| {
        sink.lock().unwrap().push(event.event_type().to_string());
        Ok(())
    });

    for i in 0..5 {
        peer.send_json(&json!({ "type": "order.update", "id": format!("o-{i}"), "status": "in_progress" }));
    }
    peer.send_json(&json!({ "type": "pong" }));
    settle().await;

    let expected: Vec<String> = (0..5).map(|i| format!("o-{i}")).collect();
    assert_eq!(*typed.lock().unwrap(), expected);
    assert_eq!(raw.lock().unwrap().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frames_are_dropped() {
    let mut app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    let peer = app.open_stream().await;

    let seen = Arc::new(Mutex::new(0));
    let sink = seen.clone();
    app.context.connection.on_message(move |_| {
        *sink.lock().unwrap() += 1;
        Ok(())
    });

    peer.send_text("{not json");
    peer.send_text("");
    peer.send_text("[1, 2, 3]");
    peer.send_json(&json!({ "type": 42 }));
    peer.send_text(format!(r#"{{"type":"order.update","pad":"{}"}}"#, "x".repeat(70_000)));
    peer.send_json(&json!({ "type": "order.update", "id": "o-1" }));
    settle().await;

    assert_eq!(*seen.lock().unwrap(), 1);
    assert_eq!(app.context.connection.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_inbound_ping_is_dispatched() {
    let mut app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    let peer = app.open_stream().await;

    let pings = Arc::new(Mutex::new(0));
    let sink = pings.clone();
    app.context.dispatcher.subscribe_fn("ping", move |_| {
        *sink.lock().unwrap() += 1;
        Ok(())
    });

    peer.send_json(&json!({ "type": "ping", "timestamp": 1 }));
    settle().await;
    assert_eq!(*pings.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_backoff_doubles_and_gives_up() {
    let app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    app.connector.refuse_next(100);

    app.context.connection.connect();
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert_eq!(app.connector.attempts(), 6);
    assert_eq!(gaps(&app), secs(&[1, 2, 4, 8, 16]));
    let snapshot = app.context.connection.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Idle);
    assert!(!snapshot.reconnect_scheduled);
    assert_eq!(snapshot.reconnect_attempts, 5);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_delay_is_capped() {
    let mut config = test_config();
    config.realtime.max_reconnect_attempts = 8;
    let app = TestApp::build(config, MemoryCredentialStorage::new(), CountingRefresher::failing());
    app.login("access-1", chrono::Duration::days(30)).await;
    app.connector.refuse_next(100);

    app.context.connection.connect();
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert_eq!(gaps(&app), secs(&[1, 2, 4, 8, 16, 30, 30, 30]));
}

#[tokio::test(start_paused = true)]
async fn test_successful_open_resets_backoff() {
    let mut app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    app.connector.refuse_next(3);

    app.context.connection.connect();
    let peer = app.accept_stream().await;
    assert_eq!(gaps(&app), secs(&[1, 2, 4]));

    let snapshot = app.context.connection.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Open);
    assert_eq!(snapshot.reconnect_attempts, 0);
    assert_eq!(snapshot.reconnect_delay, Duration::from_secs(1));

    let start = tokio::time::Instant::now();
    peer.close(1006, "network lost");
    let _next = app.accept_stream().await;
    assert_eq!(start.elapsed(), Duration::from_secs(1));
    assert_eq!(app.connector.attempts(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_scheduled_reconnect() {
    let app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    app.connector.refuse_next(1);

    app.context.connection.connect();
    settle().await;
    assert!(app.context.connection.snapshot().reconnect_scheduled);

    app.context.connection.disconnect();
    assert!(!app.context.connection.snapshot().reconnect_scheduled);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(app.connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_stops_heartbeat() {
    let mut app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    let mut peer = app.open_stream().await;
    assert!(app.context.connection.snapshot().heartbeat_active);

    app.context.connection.disconnect();
    let snapshot = app.context.connection.snapshot();
    assert!(!snapshot.heartbeat_active);
    assert!(!snapshot.reconnect_scheduled);

    tokio::time::sleep(Duration::from_secs(300)).await;
    let mut frames = Vec::new();
    while let Some(frame) = peer.try_recv() {
        frames.push(frame);
    }
    assert_eq!(
        frames,
        vec![WireMessage::Close {
            code: 1000,
            reason: "User logout or navigation".to_string()
        }]
    );
    assert_eq!(app.connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_card_save_confirmation() {
    let mut app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    let peer = app.open_stream().await;

    let dispatcher = app.context.dispatcher.clone();
    let waiter = tokio::spawn(async move {
        await_confirmation(&dispatcher, ConfirmationRequest::card_save(Duration::from_secs(60))).await
    });
    settle().await;

    peer.send_json(&json!({ "type": "card.save_failed", "cardError": "Card declined" }));
    match waiter.await.unwrap() {
        Confirmation::Rejected(event) => {
            assert_eq!(event.str_field("cardError"), Some("Card declined"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(app.context.dispatcher.total_handlers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_payment_stays_pending() {
    let mut app = TestApp::new();
    app.login("access-1", chrono::Duration::days(30)).await;
    let _peer = app.open_stream().await;

    let start = tokio::time::Instant::now();
    let outcome = await_confirmation(
        &app.context.dispatcher,
        ConfirmationRequest::subscription_payment(Duration::from_secs(60)),
    )
    .await;

    assert_eq!(outcome, Confirmation::Pending);
    assert!(!outcome.is_confirmed());
    assert_eq!(start.elapsed(), Duration::from_secs(60));
}
