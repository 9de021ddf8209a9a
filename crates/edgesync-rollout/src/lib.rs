//! edgesync rollout: the artifact rollout state machine.
//!
//! This crate keeps a locally served artifact in sync with the version
//! published in a remote store. One call to
//! [`RolloutController::check_and_rollout`] detects a new version, stages
//! it, validates it, switches the live link to it, and reloads the
//! service, rolling back automatically when the reload fails.
//!
//! # Components
//!
//! - **`contracts`**: Collaborator traits (artifact store, command runner, link manager)
//! - **`controller`**: Rollout state machine and the thread-safe status read
//! - **`error`**: Cycle error taxonomy (transient, rejected, rolled back, fatal)
//! - **`fakes`**: Recording in-memory collaborators (`test-util` feature)

pub mod contracts;
pub mod controller;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fakes;

pub use contracts::{ArtifactStore, CommandError, CommandRunner, LinkError, LinkManager, StoreError};
pub use controller::{CycleOutcome, CycleReport, RolloutController, RolloutPhase, RolloutWarning};
pub use edgesync_core::{RolloutConfig, VersionTag};
pub use error::{ErrorKind, RollbackFailure, RolloutError};
