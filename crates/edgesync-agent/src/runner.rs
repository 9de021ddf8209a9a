//! Runs the deploy script as a child process.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use edgesync_rollout::{CommandError, CommandRunner};

/// Executes `script args...` and waits for it.
///
/// With a timeout set, a child that outlives it is killed and the run
/// fails with [`CommandError::Timeout`].
#[derive(Debug, Clone, Default)]
pub struct ScriptRunner {
    timeout: Option<Duration>,
}

impl ScriptRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ScriptRunner {
    async fn run(&self, script: &Path, args: &[String]) -> Result<(), CommandError> {
        let command = command_line(script, args);
        debug!(%command, "running script");
        let started = Instant::now();

        let mut cmd = tokio::process::Command::new(script);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(after) => tokio::time::timeout(after, cmd.output())
                .await
                .map_err(|_| CommandError::Timeout {
                    command: command.clone(),
                    after,
                })?,
            None => cmd.output().await,
        }
        .map_err(|source| CommandError::Spawn {
            command: command.clone(),
            source,
        })?;

        if output.status.success() {
            debug!(%command, elapsed_ms = started.elapsed().as_millis() as u64, "script succeeded");
            return Ok(());
        }

        // stdout first, then stderr.
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(CommandError::Exit {
            command,
            code: output.status.code(),
            output: combined.trim().to_string(),
        })
    }
}

fn command_line(script: &Path, args: &[String]) -> String {
    std::iter::once(script.display().to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}
