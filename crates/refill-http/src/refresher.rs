//! Refresh endpoint client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::debug;

use refill_core::error::{AppError, ErrorKind};
use refill_core::result::AppResult;
use refill_core::traits::TokenRefresher;
use refill_core::types::RefreshedTokens;

use crate::response::api_error;
use crate::transport::{HttpRequest, HttpTransport};

/// Calls `POST {base_url}{refresh_path}` with `{"refreshToken": ...}`.
///
/// Talks to the transport directly: a refresh never carries a bearer token
/// and never triggers another refresh.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    transport: Arc<dyn HttpTransport>,
    url: String,
}

impl HttpTokenRefresher {
    /// Create a refresher for the given API base URL and endpoint path.
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: &str, refresh_path: &str) -> Self {
        Self {
            transport,
            url: format!("{}{}", base_url.trim_end_matches('/'), refresh_path),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> AppResult<RefreshedTokens> {
        let request = HttpRequest {
            method: Method::POST,
            url: self.url.clone(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(json!({ "refreshToken": refresh_token }).to_string().into_bytes()),
        };

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(api_error(&response));
        }

        debug!(status = response.status, "Refresh endpoint responded");
        serde_json::from_slice(&response.body).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                "Refresh response is missing the token pair",
                e,
            )
        })
    }
}
