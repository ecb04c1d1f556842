//! Authenticated request execution.
//!
//! Per logical request:
//!
//! 1. Resolve a bearer token (refreshing once when none is cached).
//! 2. Send, retrying transport failures with a fixed delay.
//! 3. On 401, refresh once and resend once with no transport retries.
//! 4. On an authenticated request, the account-not-found error code ends
//!    the session at any point.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use refill_core::config::HttpConfig;
use refill_core::error::AppError;
use refill_core::result::AppResult;
use refill_core::traits::SessionAuthority;

use crate::request::RequestSpec;
use crate::response::{api_error, decode_body};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Wraps outbound requests with bearer injection and refresh-and-retry.
#[derive(Clone)]
pub struct AuthenticatedRequestExecutor {
    /// HTTP transport.
    transport: Arc<dyn HttpTransport>,
    /// Token source and refresh entry point.
    session: Arc<dyn SessionAuthority>,
    /// Request settings.
    config: HttpConfig,
}

impl std::fmt::Debug for AuthenticatedRequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedRequestExecutor")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .finish()
    }
}

impl AuthenticatedRequestExecutor {
    /// Create an executor.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionAuthority>,
        config: HttpConfig,
    ) -> Self {
        Self {
            transport,
            session,
            config,
        }
    }

    /// Execute a request and decode its body.
    ///
    /// Returns `SessionExpired` when no usable token can be obtained or a
    /// refreshed token is rejected again, and `AccountNotFound` when the
    /// backend reports the account is gone. Both end the session.
    pub async fn execute(&self, spec: &RequestSpec, requires_auth: bool) -> AppResult<Value> {
        let auth_endpoint = spec.path.starts_with(&self.config.auth_path_prefix);

        let mut token = None;
        if requires_auth {
            token = self.session.access_token();
            if token.is_none() && !auth_endpoint {
                debug!(path = %spec.path, "No cached access token, refreshing");
                token = self.session.refresh_session().await;
                if token.is_none() {
                    return Err(self.expire_session(&spec.path).await);
                }
            }
        }

        let response = self
            .send_with_retry(spec, token.as_deref(), self.config.max_retries)
            .await?;
        if response.is_success() {
            return decode_body(&response);
        }

        let err = self.classify(response, requires_auth).await;
        let rejected_token = err.status == Some(401) && token.is_some() && !auth_endpoint;
        if !rejected_token || err.is_session_terminal() {
            return Err(err);
        }

        info!(path = %spec.path, "Access token rejected, refreshing once");
        let Some(new_token) = self.session.refresh_session().await else {
            return Err(self.expire_session(&spec.path).await);
        };

        let response = self.send_with_retry(spec, Some(&new_token), 0).await?;
        if response.is_success() {
            return decode_body(&response);
        }

        let err = self.classify(response, requires_auth).await;
        if err.status == Some(401) && !err.is_session_terminal() {
            return Err(self.expire_session(&spec.path).await);
        }
        Err(err)
    }

    /// Execute a request and deserialize its body into `T`.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        spec: &RequestSpec,
        requires_auth: bool,
    ) -> AppResult<T> {
        let value = self.execute(spec, requires_auth).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Turn a failed response into an error, ending the session when an
    /// authenticated request reports the account no longer exists.
    async fn classify(&self, response: HttpResponse, requires_auth: bool) -> AppError {
        let err = api_error(&response);
        let account_gone = err.code.as_deref() == Some(self.config.account_not_found_code.as_str());
        if requires_auth && account_gone {
            warn!(status = response.status, "Account no longer exists, logging out");
            self.session.logout().await;
            return AppError::account_not_found(err.message).with_code(err.code);
        }
        err
    }

    async fn expire_session(&self, path: &str) -> AppError {
        warn!(path, "Session could not be renewed, logging out");
        self.session.logout().await;
        AppError::session_expired(SESSION_EXPIRED_MESSAGE)
    }

    async fn send_with_retry(
        &self,
        spec: &RequestSpec,
        token: Option<&str>,
        retries: u32,
    ) -> AppResult<HttpResponse> {
        let request = self.build_request(spec, token);
        let mut attempt = 0;
        loop {
            match self.transport.send(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < retries => {
                    attempt += 1;
                    warn!(
                        path = %spec.path,
                        attempt,
                        max_retries = retries,
                        error = %e,
                        "Transport failure, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn build_request(&self, spec: &RequestSpec, token: Option<&str>) -> HttpRequest {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), spec.path);

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        for (name, value) in &spec.headers {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        if let Some(token) = token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        HttpRequest {
            method: spec.method.clone(),
            url,
            headers,
            body: spec.body.as_ref().map(|b| b.to_string().into_bytes()),
        }
    }
}
