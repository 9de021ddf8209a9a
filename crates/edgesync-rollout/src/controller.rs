//! Rollout controller: drives the rollout state machine.
//!
//! One call to [`RolloutController::check_and_rollout`] performs at most
//! one detect → stage → validate → switch → reload cycle, rolling back to
//! the previous link target when the reload fails. The known-good version
//! sits behind a read/write lock that is only taken to copy the value out
//! or to record a successful activation, never across an `await`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, info, warn};

use edgesync_core::{RolloutConfig, VersionTag};

use crate::contracts::{ArtifactStore, CommandError, CommandRunner, LinkManager};
use crate::error::{RollbackFailure, RolloutError};

/// States of the rollout machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutPhase {
    /// No version known yet.
    Cold,
    /// A version is known and no candidate is pending.
    Steady,
    /// Asking the store for its current version.
    Detecting,
    /// Fetching the candidate into the staging directory.
    Staging,
    /// Running the validation script against the staged candidate.
    Validating,
    /// Repointing the live link at the staged candidate.
    Switching,
    /// Asking the service to pick up the new link target.
    Reloading,
    /// Restoring the previous link target after a failed reload.
    RollingBack,
    /// Automated recovery is exhausted for this cycle.
    Fatal,
}

/// A degradation that did not stop the cycle.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RolloutWarning {
    /// The live link could not be read before switching, so a failed
    /// reload cannot be rolled back.
    RollbackAnchorUnavailable { link: PathBuf, reason: String },
}

impl std::fmt::Display for RolloutWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RolloutWarning::RollbackAnchorUnavailable { link, reason } => write!(
                f,
                "rollback anchor unavailable for {}: {reason}",
                link.display()
            ),
        }
    }
}

/// What a successful cycle did.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// First observation; recorded as the baseline, nothing activated.
    ColdStart { version: VersionTag },
    /// Remote matches the known version.
    Unchanged { version: VersionTag },
    /// A new version is live.
    Activated {
        previous: VersionTag,
        version: VersionTag,
    },
}

impl CycleOutcome {
    /// The version known after the cycle.
    pub fn version(&self) -> &VersionTag {
        match self {
            CycleOutcome::ColdStart { version }
            | CycleOutcome::Unchanged { version }
            | CycleOutcome::Activated { version, .. } => version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub warnings: Vec<RolloutWarning>,
}

impl CycleReport {
    fn new(outcome: CycleOutcome) -> Self {
        Self {
            outcome,
            warnings: Vec::new(),
        }
    }
}

/// Owns rollout state and orchestrates the three collaborators.
///
/// The host must not run two cycles at once; `current_version` may be
/// called from anywhere at any time.
pub struct RolloutController {
    config: RolloutConfig,
    store: Arc<dyn ArtifactStore>,
    runner: Arc<dyn CommandRunner>,
    links: Arc<dyn LinkManager>,
    active_link: PathBuf,
    last_known: RwLock<Option<VersionTag>>,
}

impl RolloutController {
    pub fn new(
        config: RolloutConfig,
        store: Arc<dyn ArtifactStore>,
        runner: Arc<dyn CommandRunner>,
        links: Arc<dyn LinkManager>,
        active_link: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            store,
            runner,
            links,
            active_link: active_link.into(),
            last_known: RwLock::new(None),
        }
    }

    /// Start from `Steady` with `version` as the known-good baseline.
    pub fn with_known_version(self, version: impl Into<VersionTag>) -> Self {
        self.record_version(version.into());
        self
    }

    pub fn config(&self) -> &RolloutConfig {
        &self.config
    }

    pub fn active_link(&self) -> &Path {
        &self.active_link
    }

    /// The version currently believed active.
    pub fn current_version(&self) -> Option<VersionTag> {
        self.last_known
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Where a candidate with this tag is staged.
    pub fn staging_path(&self, version: &VersionTag) -> PathBuf {
        self.config
            .staging_dir
            .join(format!("model-{}.bin", version.file_stem()))
    }

    fn record_version(&self, version: VersionTag) {
        *self
            .last_known
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(version);
    }

    /// Run one detect/validate/activate/rollback cycle.
    pub async fn check_and_rollout(&self) -> Result<CycleReport, RolloutError> {
        let bucket = &self.config.bucket;
        let key = &self.config.key;

        debug!(
            phase = ?RolloutPhase::Detecting,
            %bucket,
            %key,
            "checking for a new artifact version"
        );
        let remote = self
            .store
            .head_version(bucket, key)
            .await
            .map_err(|source| RolloutError::Lookup {
                bucket: bucket.clone(),
                key: key.clone(),
                source,
            })?;

        let Some(known) = self.current_version() else {
            // Unknown baseline: never roll out against it.
            self.record_version(remote.clone());
            info!(version = %remote, "cold start, recorded remote version as baseline");
            return Ok(CycleReport::new(CycleOutcome::ColdStart { version: remote }));
        };

        if remote == known {
            debug!(version = %remote, "artifact unchanged");
            return Ok(CycleReport::new(CycleOutcome::Unchanged { version: remote }));
        }

        info!(previous = %known, candidate = %remote, "new artifact version detected");
        let mut warnings = Vec::new();

        let prior = match self.links.get_target(&self.active_link).await {
            Ok(target) => {
                debug!(prior = %target.display(), "captured rollback anchor");
                Some(target)
            }
            Err(e) => {
                warn!(
                    link = %self.active_link.display(),
                    error = %e,
                    "cannot read current link target, continuing without a rollback anchor"
                );
                warnings.push(RolloutWarning::RollbackAnchorUnavailable {
                    link: self.active_link.clone(),
                    reason: e.to_string(),
                });
                None
            }
        };

        let staged = self.staging_path(&remote);
        if prior.as_deref() == Some(staged.as_path()) {
            warn!(
                version = %remote,
                path = %staged.display(),
                "candidate would be staged over the live artifact"
            );
            return Err(RolloutError::StagingConflict {
                version: remote,
                path: staged,
            });
        }
        debug!(phase = ?RolloutPhase::Staging, path = %staged.display(), "fetching candidate");
        self.store
            .fetch_version(bucket, key, &remote, &staged)
            .await
            .map_err(|source| RolloutError::Fetch {
                version: remote.clone(),
                path: staged.clone(),
                source,
            })?;
        info!(version = %remote, path = %staged.display(), "candidate staged");

        debug!(phase = ?RolloutPhase::Validating, version = %remote, "validating candidate");
        self.runner
            .run(&self.config.script_path, &validate_args(&staged))
            .await
            .map_err(|source| RolloutError::Validation {
                version: remote.clone(),
                source,
            })?;
        info!(version = %remote, "candidate passed validation");

        debug!(
            phase = ?RolloutPhase::Switching,
            link = %self.active_link.display(),
            target = %staged.display(),
            "switching live link"
        );
        self.links
            .set_target(&staged, &self.active_link)
            .await
            .map_err(|source| RolloutError::Activation {
                version: remote.clone(),
                source,
            })?;

        debug!(phase = ?RolloutPhase::Reloading, version = %remote, "reloading service");
        if let Err(reload) = self.runner.run(&self.config.script_path, &reload_args()).await {
            return Err(self.roll_back(remote, staged, prior, reload).await);
        }

        self.record_version(remote.clone());
        info!(previous = %known, version = %remote, "rollout complete");
        Ok(CycleReport {
            outcome: CycleOutcome::Activated {
                previous: known,
                version: remote,
            },
            warnings,
        })
    }

    async fn roll_back(
        &self,
        version: VersionTag,
        staged: PathBuf,
        prior: Option<PathBuf>,
        reload: CommandError,
    ) -> RolloutError {
        warn!(
            phase = ?RolloutPhase::RollingBack,
            %version,
            error = %reload,
            "reload failed on new artifact, rolling back"
        );

        let Some(prior) = prior else {
            error!(
                %version,
                link = %self.active_link.display(),
                "no rollback anchor was captured, link left on the failing artifact"
            );
            return RolloutError::RollbackUnavailable {
                version,
                staged,
                reload,
            };
        };

        if let Err(source) = self.links.set_target(&prior, &self.active_link).await {
            error!(%version, prior = %prior.display(), error = %source, "rollback relink failed");
            return RolloutError::RollbackFailed {
                version,
                reload,
                failure: RollbackFailure::Relink { prior, source },
            };
        }

        if let Err(source) = self.runner.run(&self.config.script_path, &reload_args()).await {
            error!(%version, prior = %prior.display(), error = %source, "rollback reload failed");
            return RolloutError::RollbackFailed {
                version,
                reload,
                failure: RollbackFailure::Reload { prior, source },
            };
        }

        info!(%version, restored = %prior.display(), "rollback succeeded");
        RolloutError::RolledBack { version, reload }
    }
}

fn validate_args(staged: &Path) -> Vec<String> {
    vec!["--test".to_string(), staged.to_string_lossy().into_owned()]
}

fn reload_args() -> Vec<String> {
    vec!["--reload".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fakes::{FakeLinks, FakeRunner, FakeStore};

    const ACTIVE_LINK: &str = "/var/lib/edgesync/active_model";
    const OLD_TARGET: &str = "/var/lib/edgesync/models/model-v1-old-model.bin";
    const NEW_TARGET: &str = "/var/lib/edgesync/models/model-v2-new-model.bin";

    fn test_config() -> RolloutConfig {
        RolloutConfig {
            bucket: "test-bucket".to_string(),
            key: "model.bin".to_string(),
            script_path: PathBuf::from("deploy.sh"),
            staging_dir: PathBuf::from("/var/lib/edgesync/models"),
        }
    }

    struct Harness {
        store: Arc<FakeStore>,
        runner: Arc<FakeRunner>,
        links: Arc<FakeLinks>,
        controller: RolloutController,
    }

    fn harness(store: FakeStore, links: FakeLinks, known: Option<&str>) -> Harness {
        let store = Arc::new(store);
        let runner = Arc::new(FakeRunner::new());
        let links = Arc::new(links);
        let mut controller = RolloutController::new(
            test_config(),
            store.clone(),
            runner.clone(),
            links.clone(),
            ACTIVE_LINK,
        );
        if let Some(known) = known {
            controller = controller.with_known_version(known);
        }
        Harness {
            store,
            runner,
            links,
            controller,
        }
    }

    #[tokio::test]
    async fn cold_start_records_version_without_rollout() {
        let h = harness(FakeStore::serving("T1"), FakeLinks::pointing_at(OLD_TARGET), None);
        assert_eq!(h.controller.current_version(), None);

        let report = h.controller.check_and_rollout().await.unwrap();
        assert_eq!(
            report.outcome,
            CycleOutcome::ColdStart {
                version: "T1".into()
            }
        );
        assert_eq!(h.controller.current_version(), Some("T1".into()));
        assert!(h.store.fetches().is_empty());
        assert!(h.runner.calls().is_empty());
        assert!(h.links.sets().is_empty());
    }

    #[tokio::test]
    async fn steady_state_is_a_no_op() {
        let h = harness(
            FakeStore::serving("T1"),
            FakeLinks::pointing_at(OLD_TARGET),
            Some("T1"),
        );

        for _ in 0..3 {
            let report = h.controller.check_and_rollout().await.unwrap();
            assert_eq!(
                report.outcome,
                CycleOutcome::Unchanged {
                    version: "T1".into()
                }
            );
        }
        assert_eq!(h.store.head_calls(), 3);
        assert!(h.store.fetches().is_empty());
        assert!(h.runner.calls().is_empty());
        assert!(h.links.sets().is_empty());
    }

    #[tokio::test]
    async fn happy_path_stages_validates_switches_and_reloads() {
        let h = harness(
            FakeStore::serving("v2-new-model"),
            FakeLinks::pointing_at(OLD_TARGET),
            Some("v1-old-model"),
        );

        let report = h.controller.check_and_rollout().await.unwrap();
        assert_eq!(
            report.outcome,
            CycleOutcome::Activated {
                previous: "v1-old-model".into(),
                version: "v2-new-model".into(),
            }
        );
        assert!(report.warnings.is_empty());

        assert_eq!(h.store.fetches(), vec![PathBuf::from(NEW_TARGET)]);
        assert_eq!(
            h.runner.command_lines(),
            vec![
                format!("deploy.sh --test {NEW_TARGET}"),
                "deploy.sh --reload".to_string(),
            ]
        );
        assert_eq!(h.links.sets(), vec![PathBuf::from(NEW_TARGET)]);
        assert_eq!(h.links.current(), Some(PathBuf::from(NEW_TARGET)));
        assert_eq!(h.controller.current_version(), Some("v2-new-model".into()));
    }

    #[tokio::test]
    async fn lookup_failure_changes_nothing() {
        let h = harness(FakeStore::unreachable(), FakeLinks::pointing_at(OLD_TARGET), None);

        let err = h.controller.check_and_rollout().await.unwrap_err();
        assert!(matches!(err, RolloutError::Lookup { .. }));
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(h.controller.current_version(), None);
    }

    #[tokio::test]
    async fn fetch_failure_stops_before_validation() {
        let h = harness(
            FakeStore::serving("v2-new-model"),
            FakeLinks::pointing_at(OLD_TARGET),
            Some("v1-old-model"),
        );
        h.store.fail_fetches();

        let err = h.controller.check_and_rollout().await.unwrap_err();
        assert!(matches!(err, RolloutError::Fetch { .. }));
        assert_eq!(err.phase(), RolloutPhase::Staging);
        assert!(h.runner.calls().is_empty());
        assert!(h.links.sets().is_empty());
        assert_eq!(h.controller.current_version(), Some("v1-old-model".into()));
    }

    #[tokio::test]
    async fn validation_rejection_leaves_link_and_version() {
        let h = harness(
            FakeStore::serving("v2-new-model"),
            FakeLinks::pointing_at(OLD_TARGET),
            Some("v1-old-model"),
        );
        h.runner.fail_on("--test");

        let err = h.controller.check_and_rollout().await.unwrap_err();
        assert!(matches!(err, RolloutError::Validation { .. }));
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert!(err.to_string().contains("validation rejected v2-new-model"));
        assert_eq!(h.runner.calls().len(), 1);
        assert!(h.links.sets().is_empty());
        assert_eq!(h.links.current(), Some(PathBuf::from(OLD_TARGET)));
        assert_eq!(h.controller.current_version(), Some("v1-old-model".into()));
    }

    #[tokio::test]
    async fn refused_switch_is_transient() {
        let h = harness(
            FakeStore::serving("v2-new-model"),
            FakeLinks::pointing_at(OLD_TARGET),
            Some("v1-old-model"),
        );
        h.links.refuse(NEW_TARGET);

        let err = h.controller.check_and_rollout().await.unwrap_err();
        assert!(matches!(err, RolloutError::Activation { .. }));
        assert_eq!(err.kind(), ErrorKind::Transient);
        // Only the validate call; no reload against an unchanged link.
        assert_eq!(h.runner.calls().len(), 1);
        assert_eq!(h.links.current(), Some(PathBuf::from(OLD_TARGET)));
        assert_eq!(h.controller.current_version(), Some("v1-old-model".into()));
    }

    #[tokio::test]
    async fn reload_failure_rolls_back_to_prior_target() {
        let h = harness(
            FakeStore::serving("v2-new-model"),
            FakeLinks::pointing_at(OLD_TARGET),
            Some("v1-old-model"),
        );
        h.runner.fail_on("--reload");

        let err = h.controller.check_and_rollout().await.unwrap_err();
        assert!(matches!(err, RolloutError::RolledBack { .. }));
        assert_eq!(err.kind(), ErrorKind::RolledBack);
        assert!(err.to_string().contains("rollback succeeded"));

        assert_eq!(
            h.links.sets(),
            vec![PathBuf::from(NEW_TARGET), PathBuf::from(OLD_TARGET)]
        );
        assert_eq!(
            h.runner.command_lines(),
            vec![
                format!("deploy.sh --test {NEW_TARGET}"),
                "deploy.sh --reload".to_string(),
                "deploy.sh --reload".to_string(),
            ]
        );
        assert_eq!(h.links.current(), Some(PathBuf::from(OLD_TARGET)));
        assert_eq!(h.controller.current_version(), Some("v1-old-model".into()));
    }

    #[tokio::test]
    async fn double_reload_failure_is_fatal() {
        let h = harness(
            FakeStore::serving("v2-new-model"),
            FakeLinks::pointing_at(OLD_TARGET),
            Some("v1-old-model"),
        );
        h.runner.fail_on("--reload");
        h.runner.fail_on("--reload");

        let err = h.controller.check_and_rollout().await.unwrap_err();
        assert!(matches!(
            err,
            RolloutError::RollbackFailed {
                failure: RollbackFailure::Reload { .. },
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert_ne!(err.kind(), ErrorKind::RolledBack);
        assert_eq!(h.runner.calls().len(), 3);
        assert_eq!(h.controller.current_version(), Some("v1-old-model".into()));
    }

    #[tokio::test]
    async fn relink_failure_during_rollback_is_fatal() {
        let h = harness(
            FakeStore::serving("v2-new-model"),
            FakeLinks::pointing_at(OLD_TARGET),
            Some("v1-old-model"),
        );
        h.runner.fail_on("--reload");
        h.links.refuse(OLD_TARGET);

        let err = h.controller.check_and_rollout().await.unwrap_err();
        assert!(matches!(
            err,
            RolloutError::RollbackFailed {
                failure: RollbackFailure::Relink { .. },
                ..
            }
        ));
        assert!(err.is_fatal());
        // No rollback reload once the relink failed.
        assert_eq!(h.runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn unreadable_anchor_warns_but_still_activates() {
        let h = harness(
            FakeStore::serving("v2-new-model"),
            FakeLinks::unreadable(),
            Some("v1-old-model"),
        );

        let report = h.controller.check_and_rollout().await.unwrap();
        assert_eq!(report.outcome.version(), &VersionTag::from("v2-new-model"));
        assert_eq!(
            report.warnings,
            vec![RolloutWarning::RollbackAnchorUnavailable {
                link: PathBuf::from(ACTIVE_LINK),
                reason: "failed to read link /var/lib/edgesync/active_model: entity not found"
                    .to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn unreadable_anchor_makes_rollback_unavailable() {
        let h = harness(
            FakeStore::serving("v2-new-model"),
            FakeLinks::unreadable(),
            Some("v1-old-model"),
        );
        h.runner.fail_on("--reload");

        let err = h.controller.check_and_rollout().await.unwrap_err();
        assert!(matches!(err, RolloutError::RollbackUnavailable { .. }));
        assert!(err.is_fatal());
        // Never guesses a rollback target: one set, to the new artifact.
        assert_eq!(h.links.sets(), vec![PathBuf::from(NEW_TARGET)]);
        assert_eq!(h.links.current(), Some(PathBuf::from(NEW_TARGET)));
        assert_eq!(h.runner.calls().len(), 2);
        assert_eq!(h.controller.current_version(), Some("v1-old-model".into()));
    }

    #[tokio::test]
    async fn fatal_cycle_does_not_disable_the_controller() {
        let h = harness(
            FakeStore::serving("v2-new-model"),
            FakeLinks::pointing_at(OLD_TARGET),
            Some("v1-old-model"),
        );
        h.runner.fail_on("--reload");
        h.runner.fail_on("--reload");
        assert!(h.controller.check_and_rollout().await.unwrap_err().is_fatal());

        // A fixed artifact is published; the next cycle proceeds normally.
        h.store.set_version("v3-fixed-model");
        let report = h.controller.check_and_rollout().await.unwrap();
        assert_eq!(report.outcome.version(), &VersionTag::from("v3-fixed-model"));
        assert_eq!(h.controller.current_version(), Some("v3-fixed-model".into()));
    }

    #[tokio::test]
    async fn staging_path_is_derived_from_sanitized_tag() {
        let h = harness(FakeStore::serving("x"), FakeLinks::default(), None);
        assert_eq!(
            h.controller.staging_path(&"\"abc/../def\"".into()),
            PathBuf::from("/var/lib/edgesync/models/model-_abc_.._def_+9f073f80.bin")
        );
    }

    #[tokio::test]
    async fn colliding_tags_stage_to_distinct_paths() {
        let h = harness(FakeStore::serving("a_b"), FakeLinks::default(), Some("a/b"));
        let live = h.controller.staging_path(&"a/b".into());
        h.links.set_target(&live, Path::new(ACTIVE_LINK)).await.unwrap();
        h.runner.fail_on("--test");

        let err = h.controller.check_and_rollout().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        let fetched = h.store.fetches();
        assert_eq!(fetched, vec![h.controller.staging_path(&"a_b".into())]);
        assert_ne!(fetched[0], live);
        assert_eq!(h.links.current(), Some(live));
    }

    #[tokio::test]
    async fn refuses_to_stage_over_the_live_target() {
        // Link left on the candidate's file, e.g. after a rollback-unavailable cycle.
        let h = harness(
            FakeStore::serving("v2-new-model"),
            FakeLinks::pointing_at(NEW_TARGET),
            Some("v1-old-model"),
        );

        let err = h.controller.check_and_rollout().await.unwrap_err();
        assert!(matches!(err, RolloutError::StagingConflict { .. }));
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(err.phase(), RolloutPhase::Staging);
        assert!(h.store.fetches().is_empty());
        assert!(h.runner.calls().is_empty());
        assert_eq!(h.links.sets(), Vec::<PathBuf>::new());
    }

    mod concurrency {
        use super::*;
        use std::sync::atomic::{AtomicBool, Ordering};
        use tokio::sync::Notify;

        /// Runner whose reload blocks until the test releases it.
        #[derive(Default)]
        struct GatedRunner {
            entered: Notify,
            release: Notify,
        }

        #[async_trait::async_trait]
        impl CommandRunner for GatedRunner {
            async fn run(&self, _script: &Path, args: &[String]) -> Result<(), CommandError> {
                if args.iter().any(|a| a == "--reload") {
                    self.entered.notify_one();
                    self.release.notified().await;
                }
                Ok(())
            }
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn status_reads_never_block_on_an_in_flight_cycle() {
            let runner = Arc::new(GatedRunner::default());
            let controller = Arc::new(
                RolloutController::new(
                    test_config(),
                    Arc::new(FakeStore::serving("v2-new-model")),
                    runner.clone(),
                    Arc::new(FakeLinks::pointing_at(OLD_TARGET)),
                    ACTIVE_LINK,
                )
                .with_known_version("v1-old-model"),
            );

            let cycle = tokio::spawn({
                let controller = controller.clone();
                async move { controller.check_and_rollout().await }
            });
            runner.entered.notified().await;

            // The reload is parked; readers on another OS thread must not block.
            let done = Arc::new(AtomicBool::new(false));
            let reader = std::thread::spawn({
                let controller = controller.clone();
                let done = done.clone();
                move || {
                    let mut seen = Vec::new();
                    while !done.load(Ordering::SeqCst) {
                        seen.push(controller.current_version());
                    }
                    seen.push(controller.current_version());
                    seen
                }
            });

            for _ in 0..1000 {
                assert_eq!(controller.current_version(), Some("v1-old-model".into()));
            }

            runner.release.notify_one();
            let report = cycle.await.unwrap().unwrap();
            assert_eq!(report.outcome.version(), &VersionTag::from("v2-new-model"));

            done.store(true, Ordering::SeqCst);
            let seen = reader.join().unwrap();
            let old = Some(VersionTag::from("v1-old-model"));
            let new = Some(VersionTag::from("v2-new-model"));
            assert!(seen.iter().all(|v| *v == old || *v == new));
            assert_eq!(seen.last(), Some(&new));
        }
    }
}
