//! Rollout cycle errors.

use std::path::PathBuf;

use thiserror::Error;

use edgesync_core::VersionTag;

use crate::contracts::{CommandError, LinkError, StoreError};
use crate::controller::RolloutPhase;

/// How the host should treat a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Store unreachable, fetch incomplete, or link switch refused.
    /// Nothing changed; the next cycle retries.
    Transient,
    /// The candidate failed its self-test. Nothing changed.
    Rejected,
    /// Activation failed and the previous artifact is serving again.
    RolledBack,
    /// The service is not known to be serving correctly. Needs an operator.
    Fatal,
}

/// Which rollback step failed after an activation failure.
#[derive(Debug, Error)]
pub enum RollbackFailure {
    #[error("could not repoint link back to {prior}: {source}")]
    Relink {
        prior: PathBuf,
        #[source]
        source: LinkError,
    },

    #[error("reload on {prior} also failed: {source}")]
    Reload {
        prior: PathBuf,
        #[source]
        source: CommandError,
    },
}

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("version lookup for {bucket}/{key} failed: {source}")]
    Lookup {
        bucket: String,
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("fetching {version} into {path} failed: {source}")]
    Fetch {
        version: VersionTag,
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("staging path {path} for {version} is the live link target, refusing to overwrite it")]
    StagingConflict { version: VersionTag, path: PathBuf },

    #[error("validation rejected {version}: {source}")]
    Validation {
        version: VersionTag,
        #[source]
        source: CommandError,
    },

    #[error("could not activate {version}, link untouched: {source}")]
    Activation {
        version: VersionTag,
        #[source]
        source: LinkError,
    },

    #[error("rollout of {version} failed, rollback succeeded: {reload}")]
    RolledBack {
        version: VersionTag,
        #[source]
        reload: CommandError,
    },

    #[error(
        "rollout of {version} failed and rollback is unavailable (prior link target unknown), \
         link left on {staged}: {reload}"
    )]
    RollbackUnavailable {
        version: VersionTag,
        staged: PathBuf,
        #[source]
        reload: CommandError,
    },

    #[error("rollout of {version} failed ({reload}) and rollback failed: {failure}")]
    RollbackFailed {
        version: VersionTag,
        reload: CommandError,
        #[source]
        failure: RollbackFailure,
    },
}

impl RolloutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RolloutError::Lookup { .. }
            | RolloutError::Fetch { .. }
            | RolloutError::StagingConflict { .. }
            | RolloutError::Activation { .. } => ErrorKind::Transient,
            RolloutError::Validation { .. } => ErrorKind::Rejected,
            RolloutError::RolledBack { .. } => ErrorKind::RolledBack,
            RolloutError::RollbackUnavailable { .. } | RolloutError::RollbackFailed { .. } => {
                ErrorKind::Fatal
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }

    /// The state the machine was in when the cycle failed.
    pub fn phase(&self) -> RolloutPhase {
        match self {
            RolloutError::Lookup { .. } => RolloutPhase::Detecting,
            RolloutError::Fetch { .. } | RolloutError::StagingConflict { .. } => {
                RolloutPhase::Staging
            }
            RolloutError::Validation { .. } => RolloutPhase::Validating,
            RolloutError::Activation { .. } => RolloutPhase::Switching,
            RolloutError::RolledBack { .. } => RolloutPhase::RollingBack,
            RolloutError::RollbackUnavailable { .. } | RolloutError::RollbackFailed { .. } => {
                RolloutPhase::Fatal
            }
        }
    }

    /// The candidate version involved, if the cycle got that far.
    pub fn version(&self) -> Option<&VersionTag> {
        match self {
            RolloutError::Lookup { .. } => None,
            RolloutError::Fetch { version, .. }
            | RolloutError::StagingConflict { version, .. }
            | RolloutError::Validation { version, .. }
            | RolloutError::Activation { version, .. }
            | RolloutError::RolledBack { version, .. }
            | RolloutError::RollbackUnavailable { version, .. }
            | RolloutError::RollbackFailed { version, .. } => Some(version),
        }
    }
}
