//! Blob storage for uploaded media
//!
//! The repository layer hands raw bytes to a [`BlobStore`] and gets back a
//! stored path it can mint a public URL for. The default implementation
//! writes content-addressed files under the data directory.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Blob upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    /// No payload was provided
    #[error("No file provided")]
    EmptyPayload,

    /// Underlying storage failed
    #[error("Blob write failed for {bucket}/{path}: {source}")]
    Io {
        bucket: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Capability surface over the external blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `bucket/path`, returning the stored path.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, UploadError>;

    /// Public URL for a previously stored path.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Filesystem-backed blob store rooted in the data directory.
pub struct FsBlobStore {
    root: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    pub fn new(root: PathBuf, base_url: String) -> Self {
        Self { root, base_url }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::EmptyPayload);
        }

        let dir = self.root.join(bucket);
        let io_err = |source| UploadError::Io {
            bucket: bucket.to_string(),
            path: path.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&dir).await.map_err(io_err)?;
        tokio::fs::write(dir.join(path), &bytes)
            .await
            .map_err(io_err)?;

        debug!(
            bucket,
            path,
            content_type,
            size = bytes.len(),
            "Stored blob"
        );

        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/{}/{}", self.base_url, bucket, path)
    }
}

/// Derive a content-addressed blob name from the payload.
pub fn blob_name(bytes: &[u8], content_type: &str) -> String {
    let hash = blake3::hash(bytes);
    format!("{}.{}", hash.to_hex(), extension_for(content_type))
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/jpeg" | "image/jpg" => "jpg",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => "mp4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn upload_then_public_url() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().to_path_buf(), "http://cdn.test".to_string());

        let name = blob_name(b"thumbnail bytes", "image/jpeg");
        let stored = store
            .upload("thumbnails", &name, b"thumbnail bytes".to_vec(), "image/jpeg")
            .await
            .unwrap();

        assert_eq!(stored, name);
        assert!(dir.path().join("thumbnails").join(&name).exists());
        assert_eq!(
            store.public_url("thumbnails", &stored),
            format!("http://cdn.test/storage/thumbnails/{}", name)
        );
    }

    #[tokio::test]
    async fn empty_payload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().to_path_buf(), "http://cdn.test".to_string());

        let result = store.upload("videos", "clip.mp4", Vec::new(), "video/mp4").await;
        assert!(matches!(result, Err(UploadError::EmptyPayload)));
    }

    #[test]
    fn blob_names_are_stable_per_content() {
        let a = blob_name(b"same bytes", "video/mp4");
        let b = blob_name(b"same bytes", "video/mp4");
        let c = blob_name(b"other bytes", "video/mp4");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.ends_with(".mp4"));
    }
}
