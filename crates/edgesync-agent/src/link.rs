//! Atomic symlink repointing.
//!
//! A new symlink is created under a temporary name in the link's directory
//! and renamed over the old one. `rename(2)` replaces the directory entry
//! in one step, so readers see either the old target or the new one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

use edgesync_rollout::{LinkError, LinkManager};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct SymlinkManager;

impl SymlinkManager {
    pub fn new() -> Self {
        Self
    }
}

fn temp_link_path(link: &Path) -> PathBuf {
    let name = link
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "link".to_string());
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    link.with_file_name(format!(".{name}.tmp-{}-{n}", std::process::id()))
}

#[async_trait]
impl LinkManager for SymlinkManager {
    async fn set_target(&self, target: &Path, link: &Path) -> Result<(), LinkError> {
        let write_err = |source: std::io::Error| LinkError::Write {
            link: link.to_path_buf(),
            target: target.to_path_buf(),
            source,
        };

        if let Some(parent) = link.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp = temp_link_path(link);
        tokio::fs::symlink(target, &tmp).await.map_err(write_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, link).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        debug!(link = %link.display(), target = %target.display(), "link repointed");
        Ok(())
    }

    async fn get_target(&self, link: &Path) -> Result<PathBuf, LinkError> {
        tokio::fs::read_link(link)
            .await
            .map_err(|source| LinkError::Read {
                link: link.to_path_buf(),
                source,
            })
    }
}
