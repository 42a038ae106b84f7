/// Blob storage for raw image bytes
///
/// Image metadata lives in SQLite; the bytes live behind the [`BlobStore`]
/// trait, keyed by the decimal image id. Two backends are provided:
///
/// - [`FilesystemBlobStore`]: one file per key under a root directory
/// - [`MemoryBlobStore`]: a process-local map, used by tests and demos
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use vesselmark_shared::storage::{BlobStore, MemoryBlobStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryBlobStore::new();
/// store.put("17", Bytes::from_static(b"\x89PNG"), "image/png").await?;
/// let bytes = store.get("17").await?;
/// assert_eq!(&bytes[..], b"\x89PNG");
/// # Ok(())
/// # }
/// ```

pub mod filesystem;
pub mod memory;

pub use filesystem::FilesystemBlobStore;
pub use memory::MemoryBlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Error type for blob storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No blob stored under the key
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// Key contains characters the backend refuses
    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    /// Underlying I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Storage result type alias
pub type StorageResult<T> = Result<T, StorageError>;

/// Key/value store for binary content
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Stores `content` under `key`, replacing any previous blob
    async fn put(&self, key: &str, content: Bytes, content_type: &str) -> StorageResult<()>;

    /// Reads the blob stored under `key`
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Removes the blob; returns false if nothing was stored
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Whether a blob is stored under `key`
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}

/// Which blob backend to run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Files under a root directory
    #[default]
    Filesystem,

    /// Process memory (contents are lost on restart)
    Memory,
}

/// Builds the configured blob store
pub fn build_blob_store(backend: StorageBackend, root: PathBuf) -> Arc<dyn BlobStore> {
    match backend {
        StorageBackend::Filesystem => Arc::new(FilesystemBlobStore::new(root)),
        StorageBackend::Memory => Arc::new(MemoryBlobStore::new()),
    }
}

/// Checks that a key is safe to use as a single path component
///
/// Allowed: ASCII alphanumerics, `-`, `_` and `.`, not starting with `.`.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
