//! Ping loop for connection keepalive.

use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::message::ClientFrame;

/// Sends a `ping` every `interval` until `send` reports failure. The first
/// ping goes out one interval after start. Returns when a send fails.
pub async fn run_heartbeat<F>(interval: Duration, mut send: F)
where
    F: FnMut(&ClientFrame) -> bool,
{
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !send(&ClientFrame::ping()) {
            debug!("Heartbeat ping could not be sent");
            return;
        }
    }
}
