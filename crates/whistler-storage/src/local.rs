use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use whistler_core::ResourceId;

use crate::locks::{KeyedLocks, ResourceGuard};
use crate::traits::{ResourceStore, ResourceWriter, StorageError, StorageResult};

/// Local filesystem store: one file per identifier directly under `base_dir`.
#[derive(Clone)]
pub struct LocalResourceStore {
    base_dir: PathBuf,
    locks: KeyedLocks,
}

impl LocalResourceStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    pub async fn new(base_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_dir = base_dir.into();

        fs::create_dir_all(&base_dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            base_dir,
            locks: KeyedLocks::new(),
        })
    }

    pub fn base_dir(&self) -> &std::path::Path {
        &self.base_dir
    }

    /// Map an identifier to its file, refusing anything that is not a single path element.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key == "."
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
            || key.contains('\0')
        {
            return Err(StorageError::InvalidKey(format!(
                "'{}' is not a valid storage key",
                key
            )));
        }

        Ok(self.base_dir.join(key))
    }
}

#[async_trait]
impl ResourceStore for LocalResourceStore {
    async fn lock(&self, id: &ResourceId) -> ResourceGuard {
        self.locks.lock(id.as_str()).await
    }

    async fn create_or_open(&self, guard: &ResourceGuard) -> StorageResult<Box<dyn ResourceWriter>> {
        let path = self.key_to_path(guard.key())?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                StorageError::WriteFailed(format!("Failed to open {}: {}", path.display(), e))
            })?;

        tracing::debug!(path = %path.display(), "Opened resource for append");

        Ok(Box::new(LocalResourceWriter {
            file,
            path,
            written: 0,
            opened_at: Instant::now(),
        }))
    }

    async fn stat(&self, id: &ResourceId) -> StorageResult<u64> {
        let path = self.key_to_path(id.as_str())?;

        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => Err(StorageError::IoError(e)),
        }
    }
}

struct LocalResourceWriter {
    file: File,
    path: PathBuf,
    written: u64,
    opened_at: Instant,
}

#[async_trait]
impl ResourceWriter for LocalResourceWriter {
    async fn append(&mut self, bytes: &[u8]) -> StorageResult<usize> {
        self.file.write_all(bytes).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to append to {}: {}",
                self.path.display(),
                e
            ))
        })?;
        self.written += bytes.len() as u64;
        Ok(bytes.len())
    }

    async fn finalize_sync(&mut self) -> StorageResult<()> {
        self.file.flush().await.map_err(|e| {
            StorageError::SyncFailed(format!("Failed to flush {}: {}", self.path.display(), e))
        })?;
        self.file.sync_all().await.map_err(|e| {
            StorageError::SyncFailed(format!("Failed to sync {}: {}", self.path.display(), e))
        })?;

        tracing::info!(
            path = %self.path.display(),
            size_bytes = self.written,
            duration_ms = self.opened_at.elapsed().as_secs_f64() * 1000.0,
            "Local resource append synced"
        );

        Ok(())
    }
}
