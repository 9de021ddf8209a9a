//! Collaborator contracts the controller drives.
//!
//! The controller performs no I/O of its own; everything touching the
//! network, child processes, or the filesystem goes through one of these
//! traits. The agent crate supplies the real implementations and
//! [`crate::fakes`] supplies recording doubles for tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use edgesync_core::VersionTag;

/// Errors from the remote artifact store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("store returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("store response for {url} carried no version tag")]
    MissingVersion { url: String },

    #[error("{bucket}/{key} changed while fetching {expected}")]
    VersionChanged {
        bucket: String,
        key: String,
        expected: VersionTag,
    },

    #[error("store request timed out after {0:?}")]
    Timeout(Duration),

    #[error("store transport error: {0}")]
    Transport(String),

    #[error("staging I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors from running the validate/reload script.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}: {output}", describe_exit(.code))]
    Exit {
        command: String,
        code: Option<i32>,
        /// Combined stdout and stderr.
        output: String,
    },

    #[error("`{command}` did not finish within {after:?}")]
    Timeout { command: String, after: Duration },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}

/// Errors from reading or repointing the live link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to read link {link}: {source}")]
    Read {
        link: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to point {link} at {target}: {source}")]
    Write {
        link: PathBuf,
        target: PathBuf,
        source: std::io::Error,
    },
}

/// Remote version lookup and fetch.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Current version tag of `bucket/key`. Must not mutate anything.
    async fn head_version(&self, bucket: &str, key: &str) -> Result<VersionTag, StoreError>;

    /// Download `bucket/key` to `dest`. On failure no file may remain at `dest`.
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), StoreError>;

    /// Download `bucket/key` only while it is still at `version`, failing
    /// with [`StoreError::VersionChanged`] otherwise. Stores that cannot
    /// make the download conditional fall back to [`ArtifactStore::fetch`].
    async fn fetch_version(
        &self,
        bucket: &str,
        key: &str,
        version: &VersionTag,
        dest: &Path,
    ) -> Result<(), StoreError> {
        let _ = version;
        self.fetch(bucket, key, dest).await
    }
}

/// Runs the external validate/reload script to completion.
///
/// Any timeout policy belongs to the implementation; the controller waits
/// for whatever the runner returns.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, script: &Path, args: &[String]) -> Result<(), CommandError>;
}

/// The "current version" indirection.
#[async_trait]
pub trait LinkManager: Send + Sync {
    /// Point `link` at `target`. Readers must never observe a missing or
    /// half-written link, and on failure the link must be left as it was.
    async fn set_target(&self, target: &Path, link: &Path) -> Result<(), LinkError>;

    async fn get_target(&self, link: &Path) -> Result<PathBuf, LinkError>;
}
