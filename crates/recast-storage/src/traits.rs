//! Storage abstraction trait
//!
//! This module defines the Storage trait that all sink backends implement.

use async_trait::async_trait;
use recast_core::StorageBackend;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage sink abstraction
///
/// All backends (S3, local filesystem) implement this trait so the image
/// generators can persist artifacts without coupling to a backend.
///
/// **Key format:** `{folder}/{filename}`; see the crate root documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist raw bytes under `{folder}/{filename}` and return a stable,
    /// independently resolvable locator (URL).
    ///
    /// A put to a key that already holds data fails with
    /// [`StorageError::AlreadyExists`]; the sink never silently overwrites
    /// an existing locator.
    async fn put(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String>;

    /// Check whether a key already holds data.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
