//! Session authority trait consumed by the request executor and the
//! realtime connection.

use async_trait::async_trait;

/// Access to the current session without depending on its concrete store.
#[async_trait]
pub trait SessionAuthority: Send + Sync + 'static {
    /// Cached access token. Never performs I/O.
    fn access_token(&self) -> Option<String>;

    /// Whether the session is currently authenticated.
    fn is_authenticated(&self) -> bool;

    /// Single-flight refresh. Returns the new access token, or `None` when
    /// the session could not be renewed.
    async fn refresh_session(&self) -> Option<String>;

    /// End the session.
    async fn logout(&self);
}
