//! Directory-backed store: `<root>/<bucket>/<key>`, versioned by content hash.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::debug;

use edgesync_core::VersionTag;
use edgesync_rollout::{ArtifactStore, StoreError};

use super::{ensure_parent, finish_partial, partial_path};

pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(bucket).join(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if bucket.is_empty() || key.is_empty() || escapes {
            return Err(StoreError::Transport(format!(
                "object path {bucket}/{key} is outside the store root"
            )));
        }
        Ok(self.root.join(relative))
    }

    fn not_found_or_io(bucket: &str, key: &str, path: &Path, source: std::io::Error) -> StoreError {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
        } else {
            StoreError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn head_version(&self, bucket: &str, key: &str) -> Result<VersionTag, StoreError> {
        let path = self.object_path(bucket, key)?;
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| Self::not_found_or_io(bucket, key, &path, e))?;

        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf).await.map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(VersionTag::new(hex::encode(hasher.finalize())))
    }

    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), StoreError> {
        let source_path = self.object_path(bucket, key)?;
        ensure_parent(dest).await?;
        let partial = partial_path(dest);

        let copied = match tokio::fs::copy(&source_path, &partial).await {
            Ok(bytes) => match tokio::fs::File::open(&partial).await {
                Ok(file) => file.sync_all().await.map(|()| bytes),
                Err(e) => Err(e),
            }
            .map_err(|source| StoreError::Io {
                path: partial.clone(),
                source,
            }),
            Err(e) => Err(Self::not_found_or_io(bucket, key, &source_path, e)),
        };
        let bytes = finish_partial(&partial, dest, copied).await?;
        debug!(source = %source_path.display(), dest = %dest.display(), bytes, "object copied");
        Ok(())
    }
}
