//! edgesync: keeps a local service's model artifact in sync with a
//! remote object store.
//!
//! # Usage
//!
//! ```text
//! edgesync run --config /etc/edgesync/edgesync.toml
//! edgesync once --config config.json --known-version 9b2cf535f277
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use edgesync_agent::{RolloutDriver, StatusBoard, build_controller, serve_agent};
use edgesync_core::AgentConfig;

#[derive(Parser)]
#[command(name = "edgesync", about = "edgesync artifact rollout agent")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the store and serve status until interrupted.
    Run {
        /// Config file (.json or .toml).
        #[arg(long, short, default_value = "config.json")]
        config: PathBuf,

        /// Override poll_interval_secs.
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Override status_addr.
        #[arg(long)]
        status_addr: Option<String>,

        /// Version already serving; skips the cold-start baseline cycle.
        #[arg(long)]
        known_version: Option<String>,
    },
    /// Run exactly one rollout cycle and exit.
    Once {
        /// Config file (.json or .toml).
        #[arg(long, short, default_value = "config.json")]
        config: PathBuf,

        /// Version already serving; without it the cycle only records a baseline.
        #[arg(long)]
        known_version: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run {
            config,
            poll_interval,
            status_addr,
            known_version,
        } => {
            let mut config = AgentConfig::from_file(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            if let Some(secs) = poll_interval {
                config.poll_interval_secs = secs;
            }
            if let Some(addr) = status_addr {
                config.status_addr = addr;
            }
            config.validate()?;
            run_agent(config, known_version).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Once {
            config,
            known_version,
        } => {
            let config = AgentConfig::from_file(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            run_single(config, known_version).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,edgesync=debug"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn controller_for(
    config: &AgentConfig,
    known_version: Option<String>,
) -> anyhow::Result<edgesync_rollout::RolloutController> {
    let controller = build_controller(config)?;
    Ok(match known_version {
        Some(version) => controller.with_known_version(version),
        None => controller,
    })
}

async fn run_agent(config: AgentConfig, known_version: Option<String>) -> anyhow::Result<()> {
    info!(
        bucket = %config.s3_bucket,
        key = %config.s3_key,
        endpoint = %config.store_endpoint,
        "edgesync agent starting"
    );

    let controller = Arc::new(controller_for(&config, known_version)?);

    // Bind before the driver starts so a bad address never interrupts a cycle.
    let addr: SocketAddr = config.status_socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding status server to {addr}"))?;
    info!(%addr, "status server listening");

    serve_agent(
        controller,
        config.poll_interval(),
        listener,
        StatusBoard::default(),
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("shutdown signal received");
        },
    )
    .await?;

    info!("edgesync agent stopped");
    Ok(())
}

async fn run_single(
    config: AgentConfig,
    known_version: Option<String>,
) -> anyhow::Result<ExitCode> {
    let controller = Arc::new(controller_for(&config, known_version)?);
    let driver = RolloutDriver::new(controller, config.poll_interval(), StatusBoard::default());

    match driver.run_once().await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_fatal() => Ok(ExitCode::from(2)),
        Err(_) => Ok(ExitCode::from(1)),
    }
}
