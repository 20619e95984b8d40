//! Blob storage
//!
//! Uploaded media lands here; posts only keep the returned URL.
//! Deleting a post purges its media best-effort: a failed purge is
//! logged and never fails the delete.

pub mod local;
pub mod s3;

use sha2::{Digest, Sha256};

use crate::core::config::{BlobBackendKind, Config};
use crate::utils::{AppError, AppResult};

/// The configured blob backend
#[derive(Clone)]
pub enum BlobStore {
    Local(local::LocalStore),
    S3(s3::S3Store),
}

impl BlobStore {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        match config.blob_backend {
            BlobBackendKind::Local => Ok(BlobStore::Local(local::LocalStore::new(
                &config.blob_dir,
                &format!("http://localhost:{}/v1/blob", config.http_port),
            ))),
            BlobBackendKind::S3 => {
                if config.s3_endpoint.is_empty() || config.s3_bucket.is_empty() {
                    return Err(AppError::internal(
                        "BLOB_BACKEND=s3 requires S3_ENDPOINT and S3_BUCKET",
                    ));
                }
                Ok(BlobStore::S3(s3::S3Store::new(
                    &config.s3_endpoint,
                    &config.s3_bucket,
                    &config.s3_access_key,
                    &config.s3_secret_key,
                )?))
            }
        }
    }

    /// Store bytes under a content-addressed key, returning the URL
    pub async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<String> {
        match self {
            BlobStore::Local(s) => s.put(key, bytes).await,
            BlobStore::S3(s) => s.put(key, bytes, content_type).await,
        }
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        match self {
            BlobStore::Local(s) => s.delete(key).await,
            BlobStore::S3(s) => s.delete(key).await,
        }
    }

    /// Map a stored URL back to its object key, if it is ours
    pub fn key_of_url(&self, url: &str) -> Option<String> {
        match self {
            BlobStore::Local(s) => s.key_of_url(url),
            BlobStore::S3(s) => s.key_of_url(url),
        }
    }

    /// Delete every owned URL in the list, logging failures
    pub async fn purge_urls(&self, urls: &[String]) {
        for url in urls {
            let Some(key) = self.key_of_url(url) else {
                continue;
            };
            if let Err(e) = self.delete(&key).await {
                tracing::warn!(url = %url, error = %e, "Media purge failed");
            }
        }
    }
}

/// Content-addressed object key: sha256 of the bytes plus the
/// original extension, grouped by the first hash byte
pub fn object_key(bytes: &[u8], filename: &str) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    let ext = filename.rsplit('.').next().filter(|e| {
        !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric())
    });
    match ext {
        Some(ext) => format!("{}/{}.{}", &digest[..2], digest, ext.to_lowercase()),
        None => format!("{}/{}", &digest[..2], digest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_is_stable_and_grouped() {
        let k1 = object_key(b"hello", "a.PNG");
        let k2 = object_key(b"hello", "b.png");
        assert_eq!(k1, k2, "same bytes, same key");
        assert!(k1.ends_with(".png"));
        assert_eq!(&k1[2..3], "/");
    }

    #[test]
    fn object_key_without_extension() {
        let k = object_key(b"hello", "noext");
        assert!(!k.contains('.'));
    }
}
