//! Artifact store clients.
//!
//! Both clients stage through a `<dest>.partial` sibling and rename it into
//! place only once the whole object is on disk, so a failed fetch never
//! leaves a truncated candidate at the staging path.

mod local;
mod remote;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use edgesync_rollout::StoreError;

pub use self::local::LocalArtifactStore;
pub use self::remote::HttpArtifactStore;

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(".partial");
    dest.with_file_name(name)
}

async fn ensure_parent(dest: &Path) -> Result<(), StoreError> {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            }),
        _ => Ok(()),
    }
}

/// Move a completed partial file into place, or delete it.
async fn finish_partial(
    partial: &Path,
    dest: &Path,
    written: Result<u64, StoreError>,
) -> Result<u64, StoreError> {
    let result = match written {
        Ok(bytes) => tokio::fs::rename(partial, dest)
            .await
            .map(|()| bytes)
            .map_err(|source| StoreError::Io {
                path: dest.to_path_buf(),
                source,
            }),
        Err(e) => Err(e),
    };
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(partial).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %partial.display(),
                    error = %e,
                    "failed to remove partial download"
                );
            }
        }
    }
    result
}
