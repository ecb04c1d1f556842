//! Refill client: session and realtime event layer.
//!
//! Main entry point that wires the crates together, restores the stored
//! session and streams backend events to the log until interrupted.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use refill_core::config::AppConfig;
use refill_core::error::AppError;
use refill_core::result::AppResult;
use refill_realtime::message::types::event_types;
use refill_realtime::{EventEnvelope, EventHandler};
use refill_session::AppContext;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("REFILL_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main client run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Refill client v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Build services ───────────────────────────────────
    let context = AppContext::build(config)?;

    // ── Step 2: Restore the stored session ───────────────────────
    context.token_store.check_auth().await;
    let session = context.token_store.session();
    tracing::info!(
        authenticated = session.is_authenticated,
        role = ?session.role,
        "Stored session restored"
    );

    // ── Step 3: Log every domain event ───────────────────────────
    let logger: Arc<dyn EventHandler> = Arc::new(|event: &EventEnvelope| -> AppResult<()> {
        match event.domain_event() {
            Some(domain) => tracing::info!(event_type = event.event_type(), ?domain, "Event received"),
            None => tracing::info!(event_type = event.event_type(), "Event received"),
        }
        Ok(())
    });
    let subscriptions = context
        .dispatcher
        .subscribe_many(event_types::ALL.iter().copied(), logger);
    tracing::info!(count = subscriptions.len(), "Event logging enabled");

    // ── Step 4: Follow the session ───────────────────────────────
    context.coordinator.start();
    if !session.is_authenticated {
        tracing::warn!("No usable session; the event stream opens after the next login");
    }

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, closing event stream...");
    context.coordinator.stop();

    tracing::info!("Refill client shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
