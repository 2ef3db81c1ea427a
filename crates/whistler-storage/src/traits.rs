//! Storage abstraction traits

use async_trait::async_trait;
use thiserror::Error;
use whistler_core::ResourceId;

use crate::locks::ResourceGuard;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Sync failed: {0}")]
    SyncFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Append-only byte store keyed by resource identifier.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Waits for exclusive write access to `id`. Released when the guard is dropped.
    async fn lock(&self, id: &ResourceId) -> ResourceGuard;

    /// Opens the resource for appending, creating it empty when absent.
    ///
    /// Existing bytes are never truncated.
    async fn create_or_open(&self, guard: &ResourceGuard) -> StorageResult<Box<dyn ResourceWriter>>;

    /// Current size in bytes, or [`StorageError::NotFound`] if the resource was never opened.
    async fn stat(&self, id: &ResourceId) -> StorageResult<u64>;
}

/// Handle returned by [`ResourceStore::create_or_open`].
#[async_trait]
pub trait ResourceWriter: Send {
    /// Appends `bytes` at the end of the resource and returns how many were written.
    async fn append(&mut self, bytes: &[u8]) -> StorageResult<usize>;

    /// Flushes everything appended so far to durable storage.
    async fn finalize_sync(&mut self) -> StorageResult<()>;
}
