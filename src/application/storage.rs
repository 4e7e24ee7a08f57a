//! Object storage seam for post attachments.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::media::MediaUpload;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key")]
    InvalidKey,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{message}")]
    Remote { status: u16, message: String },
    #[error("object storage unreachable: {0}")]
    Transport(String),
}

/// Result of writing one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Write `upload` under `key`. Existing objects are never overwritten.
    async fn upload(&self, key: &str, upload: &MediaUpload) -> Result<StoredObject, StorageError>;

    /// Stable, externally fetchable address of a stored object.
    fn public_url(&self, key: &str) -> String;
}
