//! edgesync agent: host side of the rollout controller.
//!
//! Supplies concrete collaborators and the outer loop around
//! [`edgesync_rollout::RolloutController`]:
//!
//! ```text
//! edgesync run
//!   ├── RolloutDriver (one cycle per poll interval, never overlapping)
//!   │   └── RolloutController
//!   │       ├── HttpArtifactStore | LocalArtifactStore
//!   │       ├── ScriptRunner (deploy.sh --test <path> / --reload)
//!   │       └── SymlinkManager (atomic rename-over)
//!   └── status router (GET /, /status, /healthz)
//! ```

pub mod driver;
pub mod link;
pub mod runner;
pub mod status;
pub mod store;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use edgesync_core::{AgentConfig, StoreUri};
use edgesync_rollout::{ArtifactStore, RolloutController};

pub use driver::{CycleCounters, CycleRecord, RolloutDriver, StatusBoard};
pub use link::SymlinkManager;
pub use runner::ScriptRunner;
pub use store::{HttpArtifactStore, LocalArtifactStore};

/// Wire a controller from a validated config.
pub fn build_controller(config: &AgentConfig) -> anyhow::Result<RolloutController> {
    let store: Arc<dyn ArtifactStore> = match config.store_uri()? {
        uri @ StoreUri::Http { .. } => {
            Arc::new(HttpArtifactStore::new(uri, config.request_timeout())?)
        }
        StoreUri::Local { root } => Arc::new(LocalArtifactStore::new(root)),
    };
    let runner = Arc::new(ScriptRunner::new(config.command_timeout()));
    let links = Arc::new(SymlinkManager::new());

    Ok(RolloutController::new(
        config.rollout(),
        store,
        runner,
        links,
        config.active_link.clone(),
    ))
}

/// Run the driver and the status server on an already bound `listener`
/// until `shutdown` resolves.
///
/// The driver is only started once the listener exists, and it is always
/// stopped and awaited before returning, even when the server fails, so a
/// cycle is never dropped halfway through.
pub async fn serve_agent<F>(
    controller: Arc<RolloutController>,
    interval: Duration,
    listener: TcpListener,
    board: StatusBoard,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let driver = RolloutDriver::new(controller.clone(), interval, board.clone());
    let driver_handle = tokio::spawn(async move {
        driver.run(shutdown_rx).await;
    });

    let router = status::build_router(controller, board);
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await;

    // Let a cycle in flight finish.
    let _ = shutdown_tx.send(true);
    if let Err(e) = driver_handle.await {
        error!(error = %e, "rollout driver task failed");
    }
    info!("rollout driver stopped");

    served.context("status server failed")
}
