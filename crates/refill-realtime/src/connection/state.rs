//! Connection lifecycle state.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of the event connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport, nothing in progress.
    Idle,
    /// Transport opening, or open and waiting for `connection_established`.
    Connecting,
    /// Logically open.
    Open,
    /// Sending the normal-closure frame.
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
        }
    }
}

/// Observable connection fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    /// Lifecycle phase.
    pub state: ConnectionState,
    /// Consecutive reconnects scheduled since the last successful open.
    pub reconnect_attempts: u32,
    /// Delay the next reconnect would use.
    pub reconnect_delay: Duration,
    /// Last `pong` (or `connection_established`) received.
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    /// A reconnect timer is pending.
    pub reconnect_scheduled: bool,
    /// The heartbeat task is running.
    pub heartbeat_active: bool,
}
