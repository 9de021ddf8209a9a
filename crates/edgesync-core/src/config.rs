//! Agent configuration file parser (`edgesync.toml` or `config.json`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store_uri::StoreUri;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// On-disk agent configuration. Keys are flat so the legacy JSON layout
/// (`s3_bucket`, `s3_key`, `deploy_script_path`) loads unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub s3_bucket: String,
    pub s3_key: String,
    pub deploy_script_path: PathBuf,
    #[serde(default = "default_store_endpoint")]
    pub store_endpoint: String,
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    #[serde(default = "default_active_link")]
    pub active_link: PathBuf,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_status_addr")]
    pub status_addr: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

/// The immutable slice of configuration the rollout controller reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutConfig {
    pub bucket: String,
    pub key: String,
    pub script_path: PathBuf,
    pub staging_dir: PathBuf,
}

fn default_store_endpoint() -> String {
    "http://127.0.0.1:9000".to_string()
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("/var/lib/edgesync/models")
}

fn default_active_link() -> PathBuf {
    PathBuf::from("/var/lib/edgesync/active_model")
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_status_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl AgentConfig {
    /// Load and validate a config file. `.json` files are parsed as JSON,
    /// everything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
        .map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn from_json_str(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.s3_bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("s3_bucket must not be empty".into()));
        }
        if self.s3_key.trim().is_empty() {
            return Err(ConfigError::Invalid("s3_key must not be empty".into()));
        }
        if self.deploy_script_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "deploy_script_path must not be empty".into(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be greater than zero".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        // Staged paths become symlink targets, which resolve against the
        // link's directory rather than the working directory.
        if !self.staging_dir.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "staging_dir must be an absolute path, got {}",
                self.staging_dir.display()
            )));
        }
        if self.active_link.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("active_link must not be empty".into()));
        }
        self.status_socket_addr()?;
        self.store_uri()?;
        Ok(())
    }

    pub fn rollout(&self) -> RolloutConfig {
        RolloutConfig {
            bucket: self.s3_bucket.clone(),
            key: self.s3_key.clone(),
            script_path: self.deploy_script_path.clone(),
            staging_dir: self.staging_dir.clone(),
        }
    }

    pub fn store_uri(&self) -> Result<StoreUri, ConfigError> {
        StoreUri::parse(&self.store_endpoint)
            .map_err(|e| ConfigError::Invalid(format!("store_endpoint: {e}")))
    }

    pub fn status_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.status_addr
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("status_addr {:?}: {e}", self.status_addr)))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}
