//! File-backed credential storage.
//!
//! The four keys are written as one JSON document. Saves go to a sibling
//! temporary file that is renamed over the target, so readers observe
//! either the old record or the new one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use refill_core::error::{AppError, ErrorKind};
use refill_core::result::AppResult;
use refill_core::traits::CredentialStorage;
use refill_core::types::StoredCredentials;

/// Credential storage persisted to a single JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStorage {
    /// Target file.
    path: PathBuf,
}

impl FileCredentialStorage {
    /// Create a store writing to `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn ensure_parent(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if parent.as_os_str().is_empty() {
                return Ok(());
            }
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create credential directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStorage for FileCredentialStorage {
    async fn load(&self) -> AppResult<Option<StoredCredentials>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read credentials: {}", self.path.display()),
                    e,
                ));
            }
        };

        let record = serde_json::from_slice(&data).map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Stored credentials are corrupt", e)
        })?;
        Ok(Some(record))
    }

    async fn save(&self, credentials: &StoredCredentials) -> AppResult<()> {
        self.ensure_parent().await?;
        let json = serde_json::to_vec_pretty(credentials)?;
        let temp = self.temp_path();

        fs::write(&temp, &json).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write credentials: {}", temp.display()),
                e,
            )
        })?;
        fs::rename(&temp, &self.path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to replace credentials: {}", self.path.display()),
                e,
            )
        })?;

        debug!(path = %self.path.display(), "Saved credentials");
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Cleared credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to clear credentials: {}", self.path.display()),
                e,
            )),
        }
    }
}
