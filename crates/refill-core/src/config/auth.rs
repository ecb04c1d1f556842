//! Token lifecycle configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Authentication token lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Path of the durable credential file.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    /// Tokens expiring within this many days are renewed in the background
    /// at startup.
    #[serde(default = "default_refresh_window_days")]
    pub refresh_window_days: i64,
    /// How long a caller joining an in-flight refresh waits for its result.
    #[serde(default = "default_refresh_join_timeout")]
    pub refresh_join_timeout_ms: u64,
    /// Refresh endpoint path.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
}

impl AuthConfig {
    /// Background renewal window.
    pub fn refresh_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_window_days)
    }

    /// Bounded wait for joiners of an in-flight refresh.
    pub fn refresh_join_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_join_timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            refresh_window_days: default_refresh_window_days(),
            refresh_join_timeout_ms: default_refresh_join_timeout(),
            refresh_path: default_refresh_path(),
        }
    }
}

fn default_credentials_path() -> String {
    "data/credentials.json".to_string()
}

fn default_refresh_window_days() -> i64 {
    7
}

fn default_refresh_join_timeout() -> u64 {
    5000
}

fn default_refresh_path() -> String {
    "/auth/refresh-token".to_string()
}
