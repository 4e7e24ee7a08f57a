//! Filesystem-backed media storage for the self-hosted backend.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use url::Url;

use crate::application::storage::{MediaStorage, StorageError, StoredObject};
use crate::domain::media::MediaUpload;

/// Route prefix under which stored objects are served.
pub const MEDIA_ROUTE_PREFIX: &str = "media";

#[derive(Debug)]
pub struct FilesystemMediaStorage {
    root: PathBuf,
    public_base: Url,
}

impl FilesystemMediaStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf, public_base: Url) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, public_base })
    }

    /// Read a stored object into memory.
    pub async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        let absolute = self.resolve(key)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(StorageError::InvalidKey);
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStorage for FilesystemMediaStorage {
    async fn upload(&self, key: &str, upload: &MediaUpload) -> Result<StoredObject, StorageError> {
        let absolute = self.resolve(key)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&absolute)
            .await?;
        if let Err(err) = file.write_all(&upload.bytes).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(StorageError::Io(err));
        }
        file.flush().await?;

        let checksum = hex::encode(Sha256::digest(&upload.bytes));
        debug!(
            target = "cineboard::infra::uploads",
            key,
            checksum = %checksum,
            "wrote media object"
        );

        Ok(StoredObject {
            key: key.to_string(),
            size_bytes: upload.bytes.len() as u64,
        })
    }

    fn public_url(&self, key: &str) -> String {
        let mut url = self.public_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(MEDIA_ROUTE_PREFIX)
                .extend(key.split('/'));
        }
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &tempfile::TempDir) -> FilesystemMediaStorage {
        let base = Url::parse("http://localhost:3000/").unwrap();
        FilesystemMediaStorage::new(dir.path().join("media"), base).unwrap()
    }

    fn png(bytes: &'static [u8]) -> MediaUpload {
        MediaUpload::new("poster.png", "image/png", Bytes::from_static(bytes))
    }

    #[tokio::test]
    async fn upload_writes_object_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let stored = storage
            .upload("images/1_poster.png", &png(b"\x89PNG"))
            .await
            .unwrap();

        assert_eq!(stored.key, "images/1_poster.png");
        assert_eq!(stored.size_bytes, 4);
        let read = storage.read("images/1_poster.png").await.unwrap();
        assert_eq!(read.as_ref(), b"\x89PNG");
    }

    #[tokio::test]
    async fn upload_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        storage.upload("images/1_a.png", &png(b"one")).await.unwrap();
        let err = storage
            .upload("images/1_a.png", &png(b"two"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Io(_)));
        let read = storage.read("images/1_a.png").await.unwrap();
        assert_eq!(read.as_ref(), b"one");
    }

    #[tokio::test]
    async fn empty_file_is_stored_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let stored = storage.upload("images/1_empty.png", &png(b"")).await.unwrap();

        assert_eq!(stored.size_bytes, 0);
        let read = storage.read("images/1_empty.png").await.unwrap();
        assert!(read.is_empty());
    }

    #[tokio::test]
    async fn rejects_traversal_and_absolute_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let escape = storage.upload("../escape.png", &png(b"x")).await;
        assert!(matches!(escape, Err(StorageError::InvalidKey)));

        let absolute = storage.read("/etc/passwd").await;
        assert!(matches!(absolute, Err(StorageError::InvalidKey)));
    }

    #[test]
    fn public_url_is_served_under_media_route() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        assert_eq!(
            storage.public_url("videos/17_trailer final.mp4"),
            "http://localhost:3000/media/videos/17_trailer%20final.mp4"
        );
    }
}
