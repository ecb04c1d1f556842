//! Realtime event connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Realtime (WebSocket) connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Event stream endpoint; the access token is appended as `token`.
    #[serde(default = "default_url")]
    pub url: String,
    /// Interval between `ping` control frames in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// First reconnect delay in milliseconds.
    #[serde(default = "default_initial_delay")]
    pub reconnect_initial_delay_ms: u64,
    /// Reconnect delay cap in milliseconds.
    #[serde(default = "default_max_delay")]
    pub reconnect_max_delay_ms: u64,
    /// Consecutive failed reconnects before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_reconnect_attempts: u32,
    /// Largest accepted inbound frame in bytes.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    /// How long payment and card flows wait for a confirming event.
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_seconds: u64,
}

impl RealtimeConfig {
    /// Heartbeat interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// First reconnect delay.
    pub fn reconnect_initial_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_delay_ms)
    }

    /// Reconnect delay cap.
    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }

    /// Confirmation wait for payment flows.
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_seconds)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            reconnect_initial_delay_ms: default_initial_delay(),
            reconnect_max_delay_ms: default_max_delay(),
            max_reconnect_attempts: default_max_attempts(),
            max_frame_size: default_max_frame_size(),
            confirmation_timeout_seconds: default_confirmation_timeout(),
        }
    }
}

fn default_url() -> String {
    "wss://dev-refill.kz/backend/api/v1/ws/connect".to_string()
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_max_frame_size() -> usize {
    65_536
}

fn default_confirmation_timeout() -> u64 {
    60
}
