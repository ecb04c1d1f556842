//! Durable credential storage trait.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::StoredCredentials;

/// Durable holder of the four session keys.
///
/// Implementations must write and clear all keys as one group: a concurrent
/// reader either sees the previous record or the new one, never a mix.
#[async_trait]
pub trait CredentialStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Load the stored record. Returns `None` when nothing is stored.
    async fn load(&self) -> AppResult<Option<StoredCredentials>>;

    /// Replace the stored record.
    async fn save(&self, credentials: &StoredCredentials) -> AppResult<()>;

    /// Remove the stored record. Clearing an empty store succeeds.
    async fn clear(&self) -> AppResult<()>;
}
