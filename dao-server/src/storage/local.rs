//! Filesystem blob store, served back by the blob route

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct LocalStore {
    dir: PathBuf,
    public_base: String,
}

impl LocalStore {
    pub fn new(dir: impl AsRef<Path>, public_base: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Reject keys that could escape the blob directory
    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|part| part == ".." || part.is_empty())
        {
            return Err(AppError::invalid(format!("Bad blob key: {key}")));
        }
        Ok(self.dir.join(key))
    }

    pub async fn put(&self, key: &str, bytes: Vec<u8>) -> AppResult<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::internal(format!("create blob dir: {e}")))?;
        }
        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::internal(format!("write blob: {e}")))?;
        Ok(format!("{}/{}", self.public_base, key))
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::internal(format!("remove blob: {e}"))),
        }
    }

    pub fn key_of_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_base)
            .map(|rest| rest.trim_start_matches('/').to_string())
            .filter(|k| !k.is_empty())
    }

    /// Resolve a key to its on-disk path for serving
    pub fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        self.path_for(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_delete_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path(), "http://localhost:8008/v1/blob");
        let url = store.put("ab/abcd.png", b"data".to_vec()).await.unwrap();
        assert_eq!(url, "http://localhost:8008/v1/blob/ab/abcd.png");
        let key = store.key_of_url(&url).unwrap();
        assert_eq!(key, "ab/abcd.png");
        store.delete(&key).await.unwrap();
        // idempotent
        store.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path(), "http://x");
        assert!(store.put("../evil", b"x".to_vec()).await.is_err());
        assert!(store.put("/abs", b"x".to_vec()).await.is_err());
        assert!(store.put("a//b", b"x".to_vec()).await.is_err());
    }

    #[test]
    fn foreign_urls_not_ours() {
        let store = LocalStore::new("/tmp/blobs", "http://localhost:8008/v1/blob");
        assert!(store.key_of_url("https://elsewhere/img.png").is_none());
    }
}
