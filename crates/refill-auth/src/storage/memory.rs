//! In-process credential storage.

use std::sync::Mutex;

use async_trait::async_trait;

use refill_core::result::AppResult;
use refill_core::traits::CredentialStorage;
use refill_core::types::StoredCredentials;

/// Credential storage held in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStorage {
    record: Mutex<Option<StoredCredentials>>,
}

impl MemoryCredentialStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a record.
    pub fn with_record(credentials: StoredCredentials) -> Self {
        Self {
            record: Mutex::new(Some(credentials)),
        }
    }

    /// Current record, bypassing the async trait.
    pub fn snapshot(&self) -> Option<StoredCredentials> {
        self.record
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CredentialStorage for MemoryCredentialStorage {
    async fn load(&self) -> AppResult<Option<StoredCredentials>> {
        Ok(self.snapshot())
    }

    async fn save(&self, credentials: &StoredCredentials) -> AppResult<()> {
        *self
            .record
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self
            .record
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}
