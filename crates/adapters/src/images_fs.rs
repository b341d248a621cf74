//! Filesystem-backed image storage
//!
//! Objects live under a root directory at their key's relative path and are
//! published as `{public_base_url}/{key}`, typically served by a static file
//! server pointed at the same root.

use async_trait::async_trait;
use newsdesk_domain::{ImageError, ImageStore, StoredImage};
use std::path::{Component, Path, PathBuf};

/// Image store writing objects below a root directory
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    /// Resolve a key to a path, rejecting anything that could escape the root
    fn object_path(&self, key: &str) -> Result<PathBuf, ImageError> {
        let relative = Path::new(key);
        let well_formed = !key.is_empty()
            && !key.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !well_formed {
            return Err(ImageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredImage, ImageError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(key, content_type, size = bytes.len(), "Stored image");

        Ok(StoredImage {
            key: key.to_string(),
            public_url: format!("{}/{}", self.public_base_url, key),
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, ImageError> {
        let path = self.object_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key, "Deleted image");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_base_url)?
            .strip_prefix('/')
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}
