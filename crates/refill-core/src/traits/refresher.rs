//! Token refresh network call.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::RefreshedTokens;

/// Exchanges a refresh token for a new token pair.
///
/// Any error is treated by the caller as loss of session.
#[async_trait]
pub trait TokenRefresher: Send + Sync + std::fmt::Debug + 'static {
    /// Perform one refresh call.
    async fn refresh(&self, refresh_token: &str) -> AppResult<RefreshedTokens>;
}
