//! REST API client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outbound HTTP request configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL every request path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Additional attempts after a transport-level failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between transport retries in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Backend error code signalling that the account no longer exists.
    #[serde(default = "default_account_not_found_code")]
    pub account_not_found_code: String,
    /// Paths under this prefix are authentication endpoints and never
    /// trigger token refresh.
    #[serde(default = "default_auth_path_prefix")]
    pub auth_path_prefix: String,
}

impl HttpConfig {
    /// Delay between transport retries.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            request_timeout_seconds: default_request_timeout(),
            account_not_found_code: default_account_not_found_code(),
            auth_path_prefix: default_auth_path_prefix(),
        }
    }
}

fn default_base_url() -> String {
    "https://dev-refill.kz/backend/api/v1".to_string()
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_account_not_found_code() -> String {
    "USER_NOT_FOUND".to_string()
}

fn default_auth_path_prefix() -> String {
    "/auth/".to_string()
}
