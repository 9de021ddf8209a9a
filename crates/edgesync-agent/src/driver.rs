//! Periodic driver: runs one rollout cycle per poll interval.
//!
//! Cycles never overlap: the next sleep starts only after the previous
//! cycle returned. Every outcome is logged and recorded on the
//! [`StatusBoard`] for the status endpoint.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info, warn};

use edgesync_rollout::{
    CycleOutcome, CycleReport, ErrorKind, RolloutController, RolloutError, RolloutPhase,
};

/// Running totals since the agent started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleCounters {
    pub cycles: u64,
    pub activations: u64,
    pub transient_failures: u64,
    pub rejections: u64,
    pub rollbacks: u64,
    pub fatal: u64,
}

/// Summary of the most recent cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    /// Unix seconds.
    pub completed_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CycleOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<RolloutPhase>,
    pub warnings: Vec<String>,
}

impl CycleRecord {
    fn from_result(result: &Result<CycleReport, RolloutError>) -> Self {
        let completed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        match result {
            Ok(report) => Self {
                completed_at,
                outcome: Some(report.outcome.clone()),
                error: None,
                error_kind: None,
                failed_phase: None,
                warnings: report.warnings.iter().map(ToString::to_string).collect(),
            },
            Err(e) => Self {
                completed_at,
                outcome: None,
                error: Some(e.to_string()),
                error_kind: Some(e.kind()),
                failed_phase: Some(e.phase()),
                warnings: Vec::new(),
            },
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.error_kind == Some(ErrorKind::Fatal)
    }
}

#[derive(Debug, Default)]
struct BoardState {
    last_cycle: Option<CycleRecord>,
    /// Most recent fatal cycle not yet superseded by an activation.
    unresolved_fatal: Option<CycleRecord>,
    counters: CycleCounters,
}

/// Shared record of cycle outcomes, written by the driver and read by the
/// status endpoint.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<BoardState>>,
}

impl StatusBoard {
    pub async fn record(&self, result: &Result<CycleReport, RolloutError>) {
        let record = CycleRecord::from_result(result);
        let mut guard = self.inner.write().await;
        let state = &mut *guard;
        let counters = &mut state.counters;
        counters.cycles += 1;
        match result {
            Ok(report) => {
                if matches!(report.outcome, CycleOutcome::Activated { .. }) {
                    counters.activations += 1;
                    state.unresolved_fatal = None;
                }
            }
            Err(e) => match e.kind() {
                ErrorKind::Transient => counters.transient_failures += 1,
                ErrorKind::Rejected => counters.rejections += 1,
                ErrorKind::RolledBack => counters.rollbacks += 1,
                ErrorKind::Fatal => {
                    counters.fatal += 1;
                    state.unresolved_fatal = Some(record.clone());
                }
            },
        }
        state.last_cycle = Some(record);
    }

    pub async fn last_cycle(&self) -> Option<CycleRecord> {
        self.inner.read().await.last_cycle.clone()
    }

    /// The fatal cycle still awaiting repair. Only a later activation clears
    /// it; transient or rejected cycles leave the link where it was.
    pub async fn unresolved_fatal(&self) -> Option<CycleRecord> {
        self.inner.read().await.unresolved_fatal.clone()
    }

    /// Operator acknowledgement after a manual repair.
    pub async fn clear_fatal(&self) {
        self.inner.write().await.unresolved_fatal = None;
    }

    pub async fn counters(&self) -> CycleCounters {
        self.inner.read().await.counters.clone()
    }
}

pub struct RolloutDriver {
    controller: Arc<RolloutController>,
    interval: Duration,
    board: StatusBoard,
}

impl RolloutDriver {
    pub fn new(controller: Arc<RolloutController>, interval: Duration, board: StatusBoard) -> Self {
        Self {
            controller,
            interval,
            board,
        }
    }

    /// Run a single cycle, log it, and record it.
    pub async fn run_once(&self) -> Result<CycleReport, RolloutError> {
        let result = self.controller.check_and_rollout().await;
        log_cycle(&result);
        self.board.record(&result).await;
        result
    }

    /// Cycle until `shutdown` flips. A cycle in flight is always finished.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            link = %self.controller.active_link().display(),
            "rollout driver started"
        );

        loop {
            let _ = self.run_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("rollout driver shutting down");
                    break;
                }
            }
        }
    }
}

fn log_cycle(result: &Result<CycleReport, RolloutError>) {
    match result {
        Ok(report) => {
            for warning in &report.warnings {
                warn!(%warning, "cycle completed with reduced safety");
            }
            match &report.outcome {
                CycleOutcome::ColdStart { version } => {
                    info!(%version, "baseline version recorded")
                }
                CycleOutcome::Unchanged { version } => debug!(%version, "no new version"),
                CycleOutcome::Activated { previous, version } => {
                    info!(%previous, %version, "new version activated")
                }
            }
        }
        Err(e) => {
            let phase = e.phase();
            match e.kind() {
                ErrorKind::Fatal => error!(
                    error = %e,
                    ?phase,
                    "rollout cycle failed fatally, operator intervention required"
                ),
                ErrorKind::RolledBack => {
                    warn!(error = %e, "rollout failed and was rolled back, will retry next cycle")
                }
                ErrorKind::Rejected => {
                    warn!(error = %e, "candidate rejected by validation, will retry next cycle")
                }
                ErrorKind::Transient => {
                    warn!(error = %e, ?phase, "rollout cycle failed, will retry next cycle")
                }
            }
        }
    }
}
